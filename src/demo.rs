// Processor used by the slimhttp binary
use std::io::{self, Write};

use crate::features::{Features, RequestProcessor};
use crate::http::{HttpRequest, HttpResponse, Parameter};

const PUBLIC_PREFIX: &str = "/public";

/// Serves handler statistics and echoes request parameters.
///
/// | path            | response                                  |
/// |-----------------|-------------------------------------------|
/// | `/stats`        | counters as JSON                          |
/// | `/metrics`      | counters in Prometheus text format        |
/// | `/echo`         | GET and POST parameters, one per line     |
/// | `/public/...`   | same as without the prefix, no auth       |
/// | anything else   | `404`                                     |
#[derive(Debug, Default)]
pub struct DemoProcessor;

impl RequestProcessor for DemoProcessor {
    fn resolve_features(&self, url: &str, features: &mut Features) {
        if public_path(url).is_some() {
            features.authentication = None;
        }
    }

    fn process_request(&mut self, request: &mut HttpRequest<'_>, response: &mut HttpResponse<'_>) -> io::Result<()> {
        let url = request.url();
        let path = public_path(url).unwrap_or(url);

        match path {
            "/stats" => {
                let body = crate::metrics::snapshot_json();
                response.start_content(Some("application/json"))?.write_all(body.as_bytes())
            }
            "/metrics" => {
                let body = crate::metrics::snapshot_prometheus();
                response.start_content(Some("text/plain; version=0.0.4"))?.write_all(body.as_bytes())
            }
            "/echo" => {
                let out = response.start_content(Some("text/plain"))?;
                writeln!(out, "{} {url}", request.method())?;
                while let Some(p) = request.next_get_parameter() {
                    write_param(out, "GET", p)?;
                }
                while let Some(p) = request.next_post_parameter() {
                    write_param(out, "POST", p)?;
                }
                Ok(())
            }
            _ => {
                response.set_status_code(404)?;
                response.start_content(Some("text/plain"))?.write_all(b"Not Found\n")
            }
        }
    }
}

/// The path below `/public`, when `url` is `/public` itself or lies under it.
fn public_path(url: &str) -> Option<&str> {
    let rest = url.strip_prefix(PUBLIC_PREFIX)?;
    match rest {
        "" => Some("/"),
        r if r.starts_with('/') => Some(r),
        _ => None,
    }
}

fn write_param(out: &mut dyn Write, kind: &str, p: Parameter<'_>) -> io::Result<()> {
    writeln!(
        out,
        "{kind} {}={}",
        String::from_utf8_lossy(p.name()),
        String::from_utf8_lossy(p.value())
    )
}
