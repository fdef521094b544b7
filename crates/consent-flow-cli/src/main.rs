// consent-flow-cli/src/main.rs
// ============================================================================
// Module: Consent Flow CLI Entry Point
// Description: Command dispatcher for form filling, documents, and accounts.
// Purpose: Drive the consent workflow and the account service from a shell.
// Dependencies: clap, consent-flow-*, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Consent Flow CLI fills agreements from prepared answers, renders and
//! saves them, and manages saved documents, custom templates, the signed-in
//! session, and credits. All user-facing strings are routed through the i18n
//! catalog. Inputs are untrusted: every file read is size-limited.
//!
//! Commands run on the blocking pool because the REST client blocks; the
//! assistant preview re-enters the runtime from there.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use consent_flow_assistant::AssistantBridge;
use consent_flow_assistant::AssistantSettings;
use consent_flow_assistant::AssistantStatus;
use consent_flow_assistant::ChannelConnector;
use consent_flow_assistant::RemoteEnd;
use consent_flow_assistant::SnapshotPublisher;
use consent_flow_assistant::protocol::FAREWELL;
use consent_flow_cli::answers::Answers;
use consent_flow_cli::answers::fill_builder;
use consent_flow_cli::answers::fill_step;
use consent_flow_cli::answers::select;
use consent_flow_cli::answers::sign_and_finish;
use consent_flow_cli::i18n::Locale;
use consent_flow_cli::i18n::set_locale;
use consent_flow_cli::t;
use consent_flow_client::ApiClient;
use consent_flow_client::ApiClientConfig;
use consent_flow_client::AuthSession;
use consent_flow_client::SessionStore;
use consent_flow_config::AssistantConfig;
use consent_flow_config::AuditConfig;
use consent_flow_config::AuditSinkKind;
use consent_flow_config::ConsentFlowConfig;
use consent_flow_config::RenderConfig;
use consent_flow_config::config_toml_example;
use consent_flow_core::AssistantTokenSource;
use consent_flow_core::ControllerConfig;
use consent_flow_core::DocumentId;
use consent_flow_core::DocumentType;
use consent_flow_core::FieldKind;
use consent_flow_core::FileDescriptor;
use consent_flow_core::SignatureImage;
use consent_flow_core::SigningDate;
use consent_flow_core::StepCatalog;
use consent_flow_core::StepName;
use consent_flow_core::TemplateId;
use consent_flow_core::TokenError;
use consent_flow_core::WorkflowAuditSink;
use consent_flow_core::WorkflowController;
use consent_flow_core::document_title;
use consent_flow_core::runtime::FileAuditSink;
use consent_flow_core::runtime::NoopAuditSink;
use consent_flow_core::runtime::StderrAuditSink;
use consent_flow_core::runtime::render_saved;
use consent_flow_render::PageGeometry;
use consent_flow_render::PdfRenderer;
use consent_flow_render::field_label;
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Handle;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an answers JSON input.
const MAX_ANSWERS_BYTES: usize = 1024 * 1024;
/// Maximum size of a signature or attached file.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Maximum size of custom template markup.
const MAX_TEMPLATE_BYTES: usize = 1024 * 1024;
/// Maximum size of a step catalog override.
const MAX_CATALOG_BYTES: usize = 1024 * 1024;
/// Maximum password length read from stdin.
const MAX_PASSWORD_BYTES: usize = 4096;
/// Upper bound on each assistant preview wait.
const PREVIEW_WAIT: Duration = Duration::from_secs(10);
/// Poll interval while waiting on the assistant preview.
const PREVIEW_POLL: Duration = Duration::from_millis(10);
/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "CONSENT_FLOW_LANG";
/// Environment variable holding the login password.
const PASSWORD_ENV: &str = "CONSENT_FLOW_PASSWORD";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "consent-flow", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `CONSENT_FLOW_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Config file path (defaults to consent-flow.toml or `CONSENT_FLOW_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the form step catalog.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Fill, sign, and render a document from an answers file.
    Fill(FillCommand),
    /// Manage saved documents.
    Documents {
        /// Selected documents subcommand.
        #[command(subcommand)]
        command: DocumentsCommand,
    },
    /// Manage custom agreement templates.
    Templates {
        /// Selected templates subcommand.
        #[command(subcommand)]
        command: TemplatesCommand,
    },
    /// Sign in and out.
    Auth {
        /// Selected auth subcommand.
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Check and buy credits.
    Credits {
        /// Selected credits subcommand.
        #[command(subcommand)]
        command: CreditsCommand,
    },
    /// Assistant credentials and snapshot preview.
    Assistant {
        /// Selected assistant subcommand.
        #[command(subcommand)]
        command: AssistantCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List document types.
    List,
    /// Show the steps and fields of a document type.
    Show(CatalogShowCommand),
}

/// Arguments for `catalog show`.
#[derive(Args, Debug)]
struct CatalogShowCommand {
    /// Document type key.
    #[arg(value_name = "TYPE")]
    document_type: String,
}

/// Arguments for `fill`.
#[derive(Args, Debug)]
struct FillCommand {
    /// Answers JSON file.
    #[arg(long, value_name = "PATH")]
    answers: PathBuf,
    /// Signature PNG, once per signer in order (repeatable).
    #[arg(long = "signature", value_name = "PATH")]
    signatures: Vec<PathBuf>,
    /// Output PDF path (defaults to the document title).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Signing date (`YYYY-MM-DD`, defaults to today).
    #[arg(long, value_name = "DATE")]
    date: Option<String>,
    /// Upload the document to the account after rendering.
    #[arg(long, action = ArgAction::SetTrue)]
    save: bool,
}

/// Documents subcommands.
#[derive(Subcommand, Debug)]
enum DocumentsCommand {
    /// List saved documents.
    List,
    /// Delete a saved document.
    Delete(DocumentIdArgs),
    /// Re-render a saved document to a PDF file.
    Download(DocumentDownloadCommand),
}

/// Saved document selector.
#[derive(Args, Debug)]
struct DocumentIdArgs {
    /// Saved document id.
    #[arg(long, value_name = "ID")]
    id: String,
}

/// Arguments for `documents download`.
#[derive(Args, Debug)]
struct DocumentDownloadCommand {
    /// Saved document id.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Output PDF path (defaults to the document title).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Templates subcommands.
#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// List custom templates.
    List,
    /// Add a template from an HTML-like markup file.
    Add(TemplateAddCommand),
    /// Delete a template.
    Delete(TemplateDeleteCommand),
}

/// Arguments for `templates add`.
#[derive(Args, Debug)]
struct TemplateAddCommand {
    /// Template name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Markup file using `<h3>` and `<p>` sections.
    #[arg(long, value_name = "PATH")]
    content: PathBuf,
}

/// Arguments for `templates delete`.
#[derive(Args, Debug)]
struct TemplateDeleteCommand {
    /// Template id (`custom_<millis>`).
    #[arg(long, value_name = "ID")]
    id: String,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Sign in and store the session locally.
    Login(AuthLoginCommand),
    /// Sign out and remove local session artifacts.
    Logout,
    /// Show the signed-in user.
    Status,
}

/// Arguments for `auth login`.
#[derive(Args, Debug)]
struct AuthLoginCommand {
    /// Account email.
    #[arg(long, value_name = "EMAIL")]
    email: String,
    /// Read the password from stdin (otherwise `CONSENT_FLOW_PASSWORD`).
    #[arg(long, action = ArgAction::SetTrue)]
    password_stdin: bool,
}

/// Credits subcommands.
#[derive(Subcommand, Debug)]
enum CreditsCommand {
    /// Show the credit balance.
    Balance,
    /// Start a checkout session and print its URL.
    Checkout,
    /// Confirm a completed checkout session.
    Confirm(CreditsConfirmCommand),
}

/// Arguments for `credits confirm`.
#[derive(Args, Debug)]
struct CreditsConfirmCommand {
    /// Checkout session id returned by the payment page.
    #[arg(long, value_name = "ID")]
    session_id: String,
}

/// Assistant subcommands.
#[derive(Subcommand, Debug)]
enum AssistantCommand {
    /// Request an ephemeral realtime key.
    Token(AssistantTokenCommand),
    /// Print the snapshot messages the assistant would receive for an answers file.
    Preview(AssistantPreviewCommand),
}

/// Arguments for `assistant token`.
#[derive(Args, Debug)]
struct AssistantTokenCommand {
    /// Language tag (defaults to `assistant.lang`).
    #[arg(long, value_name = "LANG")]
    lang: Option<String>,
}

/// Arguments for `assistant preview`.
#[derive(Args, Debug)]
struct AssistantPreviewCommand {
    /// Answers JSON file.
    #[arg(long, value_name = "PATH")]
    answers: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the config file.
    Validate,
    /// Print an example config file.
    Example,
}

/// Supported output languages.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Spanish.
    Es,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Es => Self::Es,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Localized message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// Underlying I/O failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// File exceeds the size limit.
    #[error("{size} bytes exceeds limit {limit}")]
    TooLarge {
        /// Observed size.
        size: u64,
        /// Permitted size.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Runs the CLI and maps errors to a failure exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        print_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    let config_path = cli.config;
    tokio::task::spawn_blocking(move || dispatch(config_path.as_deref(), command))
        .await
        .map_err(|err| CliError::new(t!("main.task_failed", error = err)))?
}

/// Dispatches a command on the blocking pool.
fn dispatch(config_path: Option<&Path>, command: Commands) -> CliResult<ExitCode> {
    let context = || Context::load(config_path);
    match command {
        Commands::Catalog {
            command,
        } => command_catalog(&context()?, &command),
        Commands::Fill(command) => command_fill(&context()?, &command),
        Commands::Documents {
            command,
        } => command_documents(&context()?, &command),
        Commands::Templates {
            command,
        } => command_templates(&context()?, &command),
        Commands::Auth {
            command,
        } => command_auth(&context()?, &command),
        Commands::Credits {
            command,
        } => command_credits(&context()?, &command),
        Commands::Assistant {
            command,
        } => command_assistant(&context()?, &command),
        Commands::Config {
            command,
        } => command_config(config_path, &command),
    }
}

/// Resolves the output locale from the flag, then the environment.
fn resolve_locale(flag: Option<LangArg>, env_value: Option<&str>) -> CliResult<Locale> {
    if let Some(flag) = flag {
        return Ok(flag.into());
    }
    match env_value {
        None => Ok(Locale::En),
        Some(value) => Locale::parse(value)
            .ok_or_else(|| CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    print_line("")
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Loaded configuration and shared collaborators.
struct Context {
    /// Validated configuration.
    config: ConsentFlowConfig,
    /// Audit sink selected by configuration.
    audit: Arc<dyn WorkflowAuditSink>,
}

impl Context {
    /// Loads configuration, falling back to defaults when no file exists.
    fn load(path: Option<&Path>) -> CliResult<Self> {
        let config = ConsentFlowConfig::load_or_default(path)
            .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
        let audit = audit_sink(&config.audit)?;
        Ok(Self {
            config,
            audit,
        })
    }

    /// Returns the local session store.
    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.config.storage.data_dir())
    }

    /// Returns the signed-in session.
    fn session(&self) -> CliResult<AuthSession> {
        self.sessions()
            .load()
            .map_err(|err| CliError::new(t!("auth.session_failed", error = err)))?
            .ok_or_else(|| CliError::new(t!("auth.required")))
    }

    /// Returns a client without credentials.
    fn client(&self) -> CliResult<ApiClient> {
        let api = &self.config.api;
        let base_url = api.base_url.clone().ok_or_else(|| CliError::new(t!("api.base_url_missing")))?;
        ApiClient::new(ApiClientConfig {
            base_url,
            allow_http: api.allow_http,
            timeout_ms: api.timeout_ms,
            user_agent: api.user_agent.clone(),
            max_response_bytes: api.max_response_bytes,
        })
        .map_err(|err| CliError::new(t!("api.client_failed", error = err)))
    }

    /// Returns a client carrying the signed-in session's token.
    fn signed_in_client(&self) -> CliResult<(ApiClient, AuthSession)> {
        let session = self.session()?;
        let client = self.client()?.with_session(&session);
        Ok((client, session))
    }

    /// Returns the configured step catalog.
    fn catalog(&self) -> CliResult<StepCatalog> {
        let Some(path) = &self.config.workflow.catalog_path else {
            return Ok(StepCatalog::builtin());
        };
        let bytes = read_input(Path::new(path), MAX_CATALOG_BYTES, "catalog")?;
        let json = String::from_utf8(bytes).map_err(|_| CliError::new(t!("input.not_utf8", path = path)))?;
        StepCatalog::from_json(&json).map_err(|err| CliError::new(t!("catalog.load_failed", path = path, error = err)))
    }

    /// Returns the configured PDF renderer.
    fn renderer(&self) -> PdfRenderer {
        renderer_for(&self.config.render)
    }

    /// Builds a controller, registering the signed-in user's templates.
    fn controller(&self, signing_date: Option<SigningDate>) -> CliResult<WorkflowController> {
        let mut controller = WorkflowController::new(
            self.catalog()?,
            ControllerConfig {
                signing_path: self.config.workflow.signing_path,
                signing_date,
            },
        )
        .with_audit_sink(Arc::clone(&self.audit));
        let sessions = self.sessions();
        if let Some(session) = sessions.load().map_err(|err| CliError::new(t!("auth.session_failed", error = err)))? {
            let templates = sessions
                .templates(&session.user.id)
                .list()
                .map_err(|err| CliError::new(t!("templates.failed", error = err)))?;
            controller.register_templates(templates);
        }
        Ok(controller)
    }
}

/// Builds the audit sink selected by configuration.
fn audit_sink(config: &AuditConfig) -> CliResult<Arc<dyn WorkflowAuditSink>> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| CliError::new(t!("audit.path_missing")))?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| CliError::new(t!("audit.open_failed", path = path, error = err)))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Builds a renderer for the configured page.
fn renderer_for(config: &RenderConfig) -> PdfRenderer {
    let (width_mm, height_mm) = config.page_size.dimensions_mm();
    PdfRenderer::new(PageGeometry::new(width_mm, height_mm, config.margin_mm))
}

/// Builds assistant settings from configuration.
fn assistant_settings(config: &AssistantConfig) -> AssistantSettings {
    AssistantSettings {
        realtime_url: config.realtime_url.clone(),
        model: config.model.clone(),
        lang: config.lang.clone(),
        connect_timeout: config.connect_timeout_ms.map(Duration::from_millis),
    }
}

// ============================================================================
// SECTION: Catalog Commands
// ============================================================================

/// Dispatches catalog subcommands.
fn command_catalog(context: &Context, command: &CatalogCommand) -> CliResult<ExitCode> {
    let catalog = context.catalog()?;
    match command {
        CatalogCommand::List => {
            for document_type in catalog.document_types() {
                print_line(&t!(
                    "catalog.list.entry",
                    key = document_type,
                    title = document_title(document_type, None),
                    steps = catalog.steps_for(document_type).len()
                ))?;
            }
        }
        CatalogCommand::Show(command) => {
            let document_type = parse_document_type(&command.document_type)?;
            let stepping = catalog.stepping_type(&document_type);
            print_line(&document_title(&document_type, None))?;
            for (index, step) in catalog.steps_for(&stepping).iter().enumerate() {
                print_line(&t!("catalog.show.step", number = index + 1, title = step.title_key))?;
                for field in &step.fields {
                    print_line(&t!(
                        "catalog.show.field",
                        id = field.id,
                        label = field_label(&field.id),
                        kind = kind_label(&field.kind)
                    ))?;
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns a short description of a field kind.
fn kind_label(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".to_string(),
        FieldKind::Email => "email".to_string(),
        FieldKind::Date => "date".to_string(),
        FieldKind::Number => "number".to_string(),
        FieldKind::Checkbox => "checkbox".to_string(),
        FieldKind::Textarea => "textarea".to_string(),
        FieldKind::File {
            accept,
        } => accept.as_ref().map_or_else(|| "file".to_string(), |accept| format!("file {accept}")),
        FieldKind::Participants(rule) => format!("participants {}-{}", rule.min, rule.max),
    }
}

/// Parses a document type key.
fn parse_document_type(value: &str) -> CliResult<DocumentType> {
    value.parse::<DocumentType>().map_err(|err| CliError::new(t!("catalog.unknown_type", error = err)))
}

// ============================================================================
// SECTION: Fill Command
// ============================================================================

/// Fills, signs, renders, and optionally saves a document.
fn command_fill(context: &Context, command: &FillCommand) -> CliResult<ExitCode> {
    let answers = load_answers(&command.answers)?;
    let files = load_answer_files(&command.answers, &answers)?;
    let signatures = command.signatures.iter().map(|path| load_signature(path)).collect::<CliResult<Vec<_>>>()?;
    let signing_date = command.date.as_deref().map(parse_signing_date).transpose()?;

    let mut controller = context.controller(signing_date)?;
    fill_builder(&mut controller, &answers, &files)
        .map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;
    let captured = sign_and_finish(&mut controller, &signatures)
        .map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;
    let job = controller.export_job().map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;

    let renderer = context.renderer();
    let document = job.render(&renderer).map_err(|err| CliError::new(t!("fill.render_failed", error = err)))?;
    let output = command.output.clone().unwrap_or_else(|| PathBuf::from(job.file_name()));
    write_output_file(&output, &document.bytes)?;
    print_line(&t!(
        "fill.written",
        path = output.display(),
        pages = document.page_count,
        signatures = captured
    ))?;
    for placeholder in &document.placeholders {
        write_stderr_line(&t!("fill.placeholder", text = placeholder))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if command.save {
        let (client, _) = context.signed_in_client()?;
        let saved = job.save(&renderer, &client).map_err(|err| CliError::new(t!("fill.save_failed", error = err)))?;
        print_line(&t!("fill.saved", id = saved.id, title = saved.title))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads and parses an answers file.
fn load_answers(path: &Path) -> CliResult<Answers> {
    let bytes = read_input(path, MAX_ANSWERS_BYTES, "answers")?;
    let json = String::from_utf8(bytes).map_err(|_| CliError::new(t!("input.not_utf8", path = path.display())))?;
    Answers::from_json(&json).map_err(|err| CliError::new(t!("fill.rejected", error = err)))
}

/// Reads the files named by an answers file, relative to its directory.
fn load_answer_files(answers_path: &Path, answers: &Answers) -> CliResult<BTreeMap<String, FileDescriptor>> {
    let base = answers_path.parent().unwrap_or_else(|| Path::new(""));
    let mut files = BTreeMap::new();
    for (field, path) in &answers.files {
        let resolved = if path.is_absolute() { path.clone() } else { base.join(path) };
        let bytes = read_input(&resolved, MAX_IMAGE_BYTES, "file")?;
        let name = resolved.file_name().map_or_else(|| field.clone(), |name| name.to_string_lossy().into_owned());
        files.insert(field.clone(), FileDescriptor::from_bytes(name, content_type_for(&resolved), bytes));
    }
    Ok(files)
}

/// Reads a signature image.
fn load_signature(path: &Path) -> CliResult<SignatureImage> {
    let bytes = read_input(path, MAX_IMAGE_BYTES, "signature")?;
    SignatureImage::from_png_bytes(bytes)
        .map_err(|err| CliError::new(t!("fill.signature_invalid", path = path.display(), error = err)))
}

/// Parses a signing date.
fn parse_signing_date(value: &str) -> CliResult<SigningDate> {
    value.parse::<SigningDate>().map_err(|err| CliError::new(t!("fill.date_invalid", value = value, error = err)))
}

/// Guesses a media type from a file extension.
fn content_type_for(path: &Path) -> &'static str {
    let extension = path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// SECTION: Document Commands
// ============================================================================

/// Dispatches saved document subcommands.
fn command_documents(context: &Context, command: &DocumentsCommand) -> CliResult<ExitCode> {
    let (client, _) = context.signed_in_client()?;
    match command {
        DocumentsCommand::List => {
            let documents =
                client.list_documents().map_err(|err| CliError::new(t!("documents.failed", error = err)))?;
            if documents.is_empty() {
                print_line(&t!("documents.list.empty"))?;
            }
            for document in documents {
                print_line(&t!(
                    "documents.list.entry",
                    id = document.id,
                    created = document.created_at.as_deref().unwrap_or("-"),
                    title = document.title
                ))?;
            }
        }
        DocumentsCommand::Delete(args) => {
            client
                .delete_document(&DocumentId::new(args.id.as_str()))
                .map_err(|err| CliError::new(t!("documents.failed", error = err)))?;
            print_line(&t!("documents.deleted", id = args.id))?;
        }
        DocumentsCommand::Download(command) => {
            let documents =
                client.list_documents().map_err(|err| CliError::new(t!("documents.failed", error = err)))?;
            let document = documents
                .into_iter()
                .find(|document| document.id.as_str() == command.id)
                .ok_or_else(|| CliError::new(t!("documents.not_found", id = command.id)))?;
            let rendered = render_saved(&document, &context.renderer(), context.audit.as_ref())
                .map_err(|err| CliError::new(t!("documents.failed", error = err)))?;
            let output = command.output.clone().unwrap_or_else(|| PathBuf::from(document.download_file_name()));
            write_output_file(&output, &rendered.bytes)?;
            print_line(&t!("documents.downloaded", path = output.display(), pages = rendered.page_count))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Template Commands
// ============================================================================

/// Dispatches custom template subcommands.
fn command_templates(context: &Context, command: &TemplatesCommand) -> CliResult<ExitCode> {
    let session = context.session()?;
    let templates = context.sessions().templates(&session.user.id);
    match command {
        TemplatesCommand::List => {
            let list = templates.list().map_err(|err| CliError::new(t!("templates.failed", error = err)))?;
            if list.is_empty() {
                print_line(&t!("templates.list.empty"))?;
            }
            for template in list {
                print_line(&t!("templates.list.entry", id = template.id, name = template.name))?;
            }
        }
        TemplatesCommand::Add(command) => {
            let bytes = read_input(&command.content, MAX_TEMPLATE_BYTES, "template")?;
            let content = String::from_utf8(bytes)
                .map_err(|_| CliError::new(t!("input.not_utf8", path = command.content.display())))?;
            let created = templates
                .create(&command.name, &content)
                .map_err(|err| CliError::new(t!("templates.failed", error = err)))?;
            print_line(&t!("templates.added", id = created.id, name = created.name))?;
        }
        TemplatesCommand::Delete(command) => {
            let id = TemplateId::new(command.id.as_str());
            templates.delete(&id).map_err(|err| CliError::new(t!("templates.failed", error = err)))?;
            print_line(&t!("templates.deleted", id = id))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Auth Commands
// ============================================================================

/// Dispatches auth subcommands.
fn command_auth(context: &Context, command: &AuthCommand) -> CliResult<ExitCode> {
    let sessions = context.sessions();
    match command {
        AuthCommand::Login(command) => {
            let password = read_password(command.password_stdin)?;
            let session = context
                .client()?
                .login(&command.email, &password)
                .map_err(|err| CliError::new(t!("auth.login_failed", error = err)))?;
            sessions.save(&session).map_err(|err| CliError::new(t!("auth.session_failed", error = err)))?;
            print_line(&t!("auth.login.ok", email = session.user.email))?;
        }
        AuthCommand::Logout => {
            let removed = sessions.logout().map_err(|err| CliError::new(t!("auth.session_failed", error = err)))?;
            match removed {
                Some(session) => print_line(&t!("auth.logout.ok", email = session.user.email))?,
                None => print_line(&t!("auth.status.signed_out"))?,
            }
        }
        AuthCommand::Status => {
            let session = sessions.load().map_err(|err| CliError::new(t!("auth.session_failed", error = err)))?;
            match session {
                Some(session) => {
                    print_line(&t!("auth.status.signed_in", email = session.user.email, id = session.user.id))?;
                }
                None => print_line(&t!("auth.status.signed_out"))?,
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads the login password from stdin or the environment.
fn read_password(from_stdin: bool) -> CliResult<String> {
    let password = if from_stdin {
        let mut buffer = String::new();
        std::io::stdin()
            .take(MAX_PASSWORD_BYTES as u64 + 1)
            .read_to_string(&mut buffer)
            .map_err(|err| CliError::new(t!("auth.password_read_failed", error = err)))?;
        if buffer.len() > MAX_PASSWORD_BYTES {
            return Err(CliError::new(t!("auth.password_too_long", limit = MAX_PASSWORD_BYTES)));
        }
        buffer.lines().next().unwrap_or_default().to_string()
    } else {
        std::env::var(PASSWORD_ENV).unwrap_or_default()
    };
    if password.is_empty() {
        return Err(CliError::new(t!("auth.password_missing", env = PASSWORD_ENV)));
    }
    Ok(password)
}

// ============================================================================
// SECTION: Credit Commands
// ============================================================================

/// Dispatches credit subcommands.
fn command_credits(context: &Context, command: &CreditsCommand) -> CliResult<ExitCode> {
    let (client, _) = context.signed_in_client()?;
    match command {
        CreditsCommand::Balance => {
            let credits = client.credit_balance().map_err(|err| CliError::new(t!("credits.failed", error = err)))?;
            print_line(&t!("credits.balance", credits = credits))?;
        }
        CreditsCommand::Checkout => {
            let url =
                client.create_checkout_session().map_err(|err| CliError::new(t!("credits.failed", error = err)))?;
            print_line(&t!("credits.checkout", url = url))?;
        }
        CreditsCommand::Confirm(command) => {
            let confirmation = client
                .confirm_checkout(&command.session_id)
                .map_err(|err| CliError::new(t!("credits.failed", error = err)))?;
            match confirmation.added {
                Some(added) => print_line(&t!("credits.confirmed.added", added = added))?,
                None => print_line(&t!("credits.confirmed"))?,
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Assistant Commands
// ============================================================================

/// Dispatches blocking assistant subcommands.
fn command_assistant(context: &Context, command: &AssistantCommand) -> CliResult<ExitCode> {
    match command {
        AssistantCommand::Token(command) => {
            if !context.config.assistant.enabled {
                return Err(CliError::new(t!("assistant.disabled")));
            }
            let lang = command.lang.clone().unwrap_or_else(|| context.config.assistant.lang.clone());
            let (client, _) = context.signed_in_client()?;
            let token = client.voice_token(&lang).map_err(|err| CliError::new(t!("assistant.token_failed", error = err)))?;
            print_line(&token)?;
            Ok(ExitCode::SUCCESS)
        }
        AssistantCommand::Preview(command) => Handle::current().block_on(command_assistant_preview(context, command)),
    }
}

/// Token source for local previews; no credentials leave the machine.
struct PreviewTokens;

impl AssistantTokenSource for PreviewTokens {
    fn ephemeral_token(&self, _lang: &str) -> Result<String, TokenError> {
        Ok("preview".to_string())
    }
}

/// Replays an answers file through the builder with the assistant bridge on
/// an in-process channel, then prints every message it sent.
async fn command_assistant_preview(context: &Context, command: &AssistantPreviewCommand) -> CliResult<ExitCode> {
    let answers = load_answers(&command.answers)?;
    let files = load_answer_files(&command.answers, &answers)?;
    let mut controller = context.controller(None)?;

    let (publisher, snapshots) = SnapshotPublisher::new(controller.snapshot());
    controller.add_observer(publisher);
    let connector = ChannelConnector::new();
    let mut bridge = AssistantBridge::new(
        assistant_settings(&context.config.assistant),
        Arc::new(PreviewTokens),
        Arc::new(connector.clone()),
        Arc::clone(&context.audit),
    );
    bridge.start(snapshots).map_err(|err| CliError::new(t!("assistant.preview_failed", error = err)))?;
    let remote = wait_for_remote(&connector, &bridge).await?;
    let collector = tokio::spawn(collect_texts(remote));

    wait_for_version(&bridge, 0).await?;
    select(&mut controller, &answers).map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;
    while controller.step() == StepName::Builder {
        fill_step(&mut controller, &answers, &files).map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;
        controller.next().map_err(|err| CliError::new(t!("fill.rejected", error = err)))?;
        wait_for_version(&bridge, controller.snapshot().snapshot_version).await?;
    }
    bridge.stop();

    let texts = collector.await.map_err(|err| CliError::new(t!("main.task_failed", error = err)))?;
    for text in texts {
        print_line(&text)?;
        print_line("")?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Waits for the bridge to open its channel.
async fn wait_for_remote(connector: &ChannelConnector, bridge: &AssistantBridge) -> CliResult<RemoteEnd> {
    let waited = tokio::time::timeout(PREVIEW_WAIT, async {
        loop {
            if let Some(remote) = connector.take_remote() {
                return Ok(remote);
            }
            if let AssistantStatus::Unavailable(reason) = bridge.status() {
                return Err(CliError::new(t!("assistant.preview_failed", error = reason)));
            }
            tokio::time::sleep(PREVIEW_POLL).await;
        }
    })
    .await;
    waited.map_err(|_| CliError::new(t!("assistant.preview_timeout")))?
}

/// Waits until the bridge has sent the snapshot for `version`.
async fn wait_for_version(bridge: &AssistantBridge, version: u64) -> CliResult<()> {
    tokio::time::timeout(PREVIEW_WAIT, async {
        while bridge.sent_version() != Some(version) {
            tokio::time::sleep(PREVIEW_POLL).await;
        }
    })
    .await
    .map_err(|_| CliError::new(t!("assistant.preview_timeout")))
}

/// Collects the user text of every message sent until the channel closes.
async fn collect_texts(mut remote: RemoteEnd) -> Vec<String> {
    let mut texts = Vec::new();
    while let Some(envelope) = remote.received.recv().await {
        if let Some(text) = envelope_text(&envelope)
            && text != FAREWELL
        {
            texts.push(text);
        }
    }
    texts
}

/// Extracts the text of a `conversation.item.create` envelope.
fn envelope_text(envelope: &str) -> Option<String> {
    let value: Value = serde_json::from_str(envelope).ok()?;
    if value.get("type")?.as_str()? != "conversation.item.create" {
        return None;
    }
    value.pointer("/item/content/0/text")?.as_str().map(ToString::to_string)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(config_path: Option<&Path>, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            ConsentFlowConfig::load(config_path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
            print_line(&t!("config.valid"))?;
        }
        ConfigCommand::Example => print_line(config_toml_example().trim_end())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Reads a file, refusing anything larger than `limit` bytes.
fn read_bytes_with_limit(path: &Path, limit: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    if size > limit as u64 {
        return Err(ReadLimitError::TooLarge {
            size,
            limit,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit as u64 + 1).read_to_end(&mut bytes)?;
    if bytes.len() > limit {
        return Err(ReadLimitError::TooLarge {
            size: bytes.len() as u64,
            limit,
        });
    }
    Ok(bytes)
}

/// Reads an input file with a localized error.
fn read_input(path: &Path, limit: usize, kind: &str) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, limit).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(t!("input.read_failed", kind = kind, path = path.display(), error = err))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!("input.read_too_large", kind = kind, path = path.display(), size = size, limit = limit)),
    })
}

/// Writes an output file with a localized error.
fn write_output_file(path: &Path, bytes: &[u8]) -> CliResult<()> {
    fs::write(path, bytes).map_err(|err| CliError::new(t!("output.file_failed", path = path.display(), error = err)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stdout with a localized error.
fn print_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
