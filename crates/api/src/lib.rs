mod job_schedulers;
mod reminder;
mod shared;
mod status;

use actix_web::{dev::Server, web, App, HttpServer};
use job_schedulers::start_dispatch_reminders_job;
use obligations_infra::ObligationsContext;
pub use reminder::dispatch_reminders::{
    DispatchRemindersUseCase, DispatchSummary, UseCaseError as DispatchRemindersError,
};
pub use reminder::sync_subject_reminders::{
    SyncSubjectRemindersUseCase, UseCaseError as SyncSubjectRemindersError,
};
pub use shared::usecase::{execute, UseCase};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    status::configure_routes(cfg);
}

pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    pub async fn new(context: ObligationsContext) -> Result<Self, std::io::Error> {
        let (server, port) = Application::configure_server(context.clone()).await?;
        Application::start_job_schedulers(context);

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_job_schedulers(context: ObligationsContext) {
        start_dispatch_reminders_job(context);
    }

    async fn configure_server(
        context: ObligationsContext,
    ) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            let ctx = context.clone();

            App::new()
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}
