use slimhttp::config;
use slimhttp::demo::DemoProcessor;
use slimhttp::server::Server;
use slimhttp::HttpHandler;

fn main() {
    slimhttp::metrics::init();
    let (mut c, source) = config::load_config();
    slimhttp::log::init(c.server.logging, &c.server.log_level);
    source.report();
    c.validate();

    let handler = match HttpHandler::from_config(&c.http, DemoProcessor) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Invalid handler settings: {e}");
            std::process::exit(1);
        }
    };
    if c.http.credentials().is_some() {
        tracing::info!("Basic authentication enabled (paths under /public are open)");
    }

    if let Err(e) = Server::new(c.server, handler).run() {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}
