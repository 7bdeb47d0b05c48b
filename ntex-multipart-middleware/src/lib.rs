#![allow(clippy::borrow_interior_mutable_const)]
//! Multipart upload middleware for ntex applications.
//!
//! [**Multipart**](struct.Multipart.html) middleware decodes
//! `multipart/form-data` requests, stores uploaded files in a fresh
//! temporary directory and hands the downstream service a plain
//! `application/x-www-form-urlencoded` body. Each file is replaced by a
//! [**FileReference**](struct.FileReference.html) value of the form
//! `<path>; filename=<name>; mimeType=<type>`.
//!
//! Stored files are never removed by the middleware.
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//!
//! use ntex::web::{self, App, Error, HttpResponse};
//! use ntex_multipart_middleware::{FileReference, Limits, Multipart};
//!
//! async fn upload(form: web::types::Form<HashMap<String, String>>) -> Result<HttpResponse, Error> {
//!     if let Some(value) = form.get("avatar") {
//!         let avatar: FileReference = value.parse()?;
//!         println!("stored {} at {:?}", avatar.filename, avatar.path);
//!     }
//!     Ok(HttpResponse::Ok().finish())
//! }
//!
//! #[ntex::main]
//! async fn main() -> std::io::Result<()> {
//!     web::server(|| {
//!         App::new()
//!             .wrap(Multipart::new().limits(Limits::default().files(1)))
//!             .service(web::resource("/upload").route(web::post().to(upload)))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
mod body;
mod decoder;
mod error;
mod limits;
mod middleware;
mod storage;

pub use self::body::FileReference;
pub use self::error::{FileReferenceError, MultipartError};
pub use self::limits::{Limits, DEFAULT_FIELD_SIZE};
pub use self::middleware::{Multipart, MultipartMiddleware};
pub use self::storage::default_base;
