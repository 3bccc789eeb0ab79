use hyper::{
    service::{make_service_fn, service_fn},
    Server,
};
use model::links::{ChildLimit, ChildLimitPolicy};
use server::{app::App, auth::TokenHandler, AppSettings, Webserver};
use std::sync::Arc;
use structopt::StructOpt;

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() {
    let env = std::env::var("LISTS_ENV").unwrap_or_else(|_| "test".to_string());

    let env_file_name = format!("{}.env", env);

    if let Err(e) = dotenv::from_filename(&env_file_name) {
        warn!(
            "environment file not found: {}, error: {}",
            env_file_name, e
        );
    }

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&server::get_required_env_var("RUST_LOG"))
        .init();

    let settings = AppSettings::from(Opts::from_args());

    let db = match database::Database::<()>::connect(&settings.database_addr).await {
        Ok(db) => db,
        Err(e) => {
            error!("failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if settings.run_migrations {
        if let Err(e) = database::migrate(db.pool()).await {
            error!("failed to run migrations: {}", e);
            std::process::exit(1);
        }
    }

    let tokens = TokenHandler::new(&settings.jwt_secret);

    let app = Arc::new(App::new(settings.clone(), db.pool().clone()));

    let webserver = Arc::new(Webserver::new(app, tokens));

    let addr = ([0, 0, 0, 0], settings.port).into();

    let service = make_service_fn(|_| {
        let webserver = webserver.clone();
        async {
            Ok::<_, hyper::Error>(service_fn(move |request| {
                let webserver = webserver.clone();
                server::entry_point(webserver, request)
            }))
        }
    });

    let server = Server::bind(&addr).serve(service);

    info!("starting server on {:?}", addr);
    if let Err(e) = server.await {
        error!("server stopped with error: {}", e);
    }
}

#[derive(StructOpt, Debug, Clone)]
pub struct Opts {
    #[structopt(long, default_value = "3000", env = "LISTS_LISTEN_PORT")]
    port: u16,
    #[structopt(long, env = "LISTS_DATABASE_ADDR")]
    database_addr: String,
    #[structopt(long, env = "LISTS_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    #[structopt(
        long,
        default_value = "false",
        env = "LISTS_PUBLISH_REQUEST_LOG",
        parse(try_from_str)
    )]
    publish_request_log: bool,
    #[structopt(
        long,
        default_value = "false",
        env = "LISTS_RUN_MIGRATIONS",
        parse(try_from_str)
    )]
    run_migrations: bool,
    #[structopt(long, default_value = "20", env = "LISTS_MAX_CHILDREN_PER_LINK")]
    max_children_per_link: usize,
    #[structopt(long, default_value = "reject", env = "LISTS_CHILD_LIMIT_POLICY")]
    child_limit_policy: ChildLimitPolicy,
    #[structopt(long, default_value = "30", env = "LISTS_MAX_SHARE_DAYS")]
    max_share_days: u32,
    #[structopt(long, default_value = "100", env = "LISTS_MAX_LISTS_PER_USER")]
    max_lists_per_user: u32,
    #[structopt(long, default_value = "1000", env = "LISTS_MAX_ITEMS_PER_LIST")]
    max_items_per_list: u32,
}

impl From<Opts> for AppSettings {
    fn from(
        Opts {
            port,
            database_addr,
            jwt_secret,
            publish_request_log,
            run_migrations,
            max_children_per_link,
            child_limit_policy,
            max_share_days,
            max_lists_per_user,
            max_items_per_list,
        }: Opts,
    ) -> Self {
        AppSettings {
            port,
            database_addr,
            jwt_secret,
            publish_request_log,
            run_migrations,
            child_limit: ChildLimit {
                max: max_children_per_link,
                policy: child_limit_policy,
            },
            max_share_days,
            max_lists_per_user,
            max_items_per_list,
        }
    }
}
