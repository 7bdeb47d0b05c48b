//! Multipart rewriting middleware.
use std::path::PathBuf;
use std::rc::Rc;

use ntex::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use ntex::service::{Middleware, Service, ServiceCtx};
use ntex::web::{ErrorRenderer, WebRequest, WebResponse, WebResponseError};

use crate::error::MultipartError;
use crate::limits::Limits;
use crate::{body, decoder, storage};

#[derive(Clone, Debug)]
struct Inner {
    base: PathBuf,
    limits: Limits,
}

/// `Middleware` that turns `multipart/form-data` requests into url-encoded forms.
///
/// Uploaded files are stored in a new directory per request and replaced
/// in the form by a `<path>; filename=<name>; mimeType=<type>` value.
/// Requests with any other content type pass through untouched.
///
/// ```rust
/// use ntex::web::{self, App};
/// use ntex_multipart_middleware::{Limits, Multipart};
///
/// let app = App::new()
///     .wrap(Multipart::new().limits(Limits::default().files(1)))
///     .service(web::resource("/upload").to(|| async { "ok" }));
/// ```
#[derive(Clone, Debug)]
pub struct Multipart(Rc<Inner>);

impl Default for Multipart {
    fn default() -> Self {
        Multipart::new()
    }
}

impl Multipart {
    /// Construct new middleware, files go to `<temp dir>/multipart`.
    pub fn new() -> Self {
        Multipart(Rc::new(Inner { base: storage::default_base(), limits: Limits::default() }))
    }

    /// Sets the directory under which per-request upload directories are created.
    pub fn temp_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        Rc::make_mut(&mut self.0).base = path.into();
        self
    }

    /// Sets decoder limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        Rc::make_mut(&mut self.0).limits = limits;
        self
    }
}

impl<S> Middleware<S> for Multipart {
    type Service = MultipartMiddleware<S>;

    fn create(&self, service: S) -> Self::Service {
        MultipartMiddleware { service, inner: self.0.clone() }
    }
}

/// Multipart rewriting middleware
pub struct MultipartMiddleware<S> {
    service: S,
    inner: Rc<Inner>,
}

impl<S, Err> Service<WebRequest<Err>> for MultipartMiddleware<S>
where
    S: Service<WebRequest<Err>, Response = WebResponse>,
    Err: ErrorRenderer,
    MultipartError: WebResponseError<Err>,
{
    type Response = WebResponse;
    type Error = S::Error;

    ntex::forward_ready!(service);
    ntex::forward_shutdown!(service);

    async fn call(
        &self,
        mut req: WebRequest<Err>,
        ctx: ServiceCtx<'_, Self>,
    ) -> Result<Self::Response, Self::Error> {
        let content_type = match joined_header(req.headers(), &header::CONTENT_TYPE) {
            Some(value) if is_multipart(&value) => value,
            _ => return ctx.call(&self.service, req).await,
        };

        let payload = req.take_payload();
        let form = match decoder::decode(payload, &content_type, &self.inner.base, &self.inner.limits)
            .await
        {
            Ok(form) => form,
            Err(e) => {
                log::debug!("Can not decode multipart request: {}", e);
                return Ok(req.render_error(e));
            }
        };

        let headers = req.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(form.len()));
        headers.remove(header::TRANSFER_ENCODING);
        req.set_payload(body::payload(form));

        ctx.call(&self.service, req).await
    }
}

/// All values of `name` joined with `,`.
fn joined_header(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let values: Vec<_> =
        headers.get_all(name).map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

fn is_multipart(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("multipart/form-data")
}
