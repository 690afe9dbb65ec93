//! GeoTask CLI - run one geodata extraction from the command line.
//!
//! Builds a task request from the arguments, runs it through the library's
//! executor, and prints the structured result. The process exits non-zero
//! when the extraction fails.

mod error;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use geotask::client::ClientError;
use geotask::executor::settings_failure;
use geotask::messages::LocalizedMessages;
use geotask::registry::{TaskRegistry, FME_SERVER_CODE};
use geotask::settings::{
    ExecutionSettings, PluginConfig, KEY_API_TOKEN, KEY_EXECUTION_MODE, KEY_GEOJSON_PARAMETER,
    KEY_PASSWORD, KEY_SERVICE_URL, KEY_USERNAME,
};
use geotask::{ExecutionResult, NotificationSettings, Status, TaskRequest};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "geotask",
    version,
    about = "Run a geodata extraction against a remote geoprocessing service"
)]
struct Cli {
    /// Data Download service URL of the remote workspace
    #[arg(long)]
    service_url: String,

    /// Service token; wins over --username/--password when both are given
    #[arg(long)]
    token: Option<String>,

    /// Basic-auth username
    #[arg(long)]
    username: Option<String>,

    /// Basic-auth password
    #[arg(long)]
    password: Option<String>,

    /// Published parameter on the workspace that receives the payload
    #[arg(long)]
    geojson_parameter: Option<String>,

    /// Execution mode: sync or async
    #[arg(long, default_value = "sync")]
    mode: String,

    /// Order perimeter as WKT
    #[arg(long, conflicts_with = "perimeter_file")]
    perimeter: Option<String>,

    /// File containing the order perimeter as WKT
    #[arg(long)]
    perimeter_file: Option<PathBuf>,

    /// JSON object of workspace parameters
    #[arg(long)]
    parameters: Option<String>,

    /// Directory the result artifact is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Message language (en or fr)
    #[arg(long, default_value = "en")]
    lang: String,

    /// Request identifier recorded on the result
    #[arg(long, default_value_t = 0)]
    request_id: i64,
}

impl Cli {
    fn settings_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(KEY_SERVICE_URL.to_string(), self.service_url.clone());
        if let Some(token) = &self.token {
            map.insert(KEY_API_TOKEN.to_string(), token.clone());
        }
        if let Some(username) = &self.username {
            map.insert(KEY_USERNAME.to_string(), username.clone());
        }
        if let Some(password) = &self.password {
            map.insert(KEY_PASSWORD.to_string(), password.clone());
        }
        if let Some(parameter) = &self.geojson_parameter {
            map.insert(KEY_GEOJSON_PARAMETER.to_string(), parameter.clone());
        }
        map.insert(KEY_EXECUTION_MODE.to_string(), self.mode.clone());
        map
    }

    fn perimeter(&self) -> Result<Option<String>, CliError> {
        if let Some(wkt) = &self.perimeter {
            return Ok(Some(wkt.clone()));
        }
        match &self.perimeter_file {
            Some(path) => std::fs::read_to_string(path)
                .map(|wkt| Some(wkt.trim().to_string()))
                .map_err(|source| CliError::PerimeterFile {
                    path: path.display().to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn request(&self) -> Result<TaskRequest, CliError> {
        Ok(TaskRequest {
            id: self.request_id,
            perimeter: self.perimeter()?,
            parameters: self.parameters.clone(),
            folder_out: self.out_dir.clone(),
            ..TaskRequest::default()
        })
    }
}

fn print_result(result: &ExecutionResult) {
    match result.status {
        Status::Success => println!("Status:   SUCCESS"),
        Status::Error => println!("Status:   ERROR"),
        Status::Standby => println!("Status:   STANDBY"),
    }
    println!("Message:  {}", result.message);
    if let Some(code) = &result.error_code {
        println!("Code:     {}", code);
    }
    if let Some(details) = &result.error_details {
        println!("Details:  {}", details);
    }
    if let Some(path) = &result.result_file_path {
        println!("Result:   {}", path.display());
    }
    println!("Duration: {:.1}s", result.processing_duration.as_secs_f64());
}

async fn run(cli: Cli) -> Result<ExecutionResult, CliError> {
    let messages = LocalizedMessages::new(&cli.lang);
    let request = cli.request()?;

    let settings = match ExecutionSettings::from_map(&cli.settings_map()) {
        Ok(settings) => settings,
        Err(e) => return Ok(settings_failure(request, &e, &messages)),
    };

    let registry = TaskRegistry::default();
    let executor = registry
        .create(FME_SERVER_CODE, settings, PluginConfig::default())
        .ok_or_else(|| CliError::Setup("no built-in task registered".to_string()))?
        .map_err(|e: ClientError| CliError::Setup(e.to_string()))?
        .with_messages(messages);

    let cancel = executor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling the execution");
            cancel.cancel();
        }
    });

    info!(request_id = request.id, "starting extraction");
    Ok(executor
        .execute(&request, &NotificationSettings::default())
        .await)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(result) => {
            print_result(&result);
            match result.status {
                Status::Success => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
