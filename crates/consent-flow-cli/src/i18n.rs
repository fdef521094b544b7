// consent-flow-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Message catalog and translation utilities for the CLI.
// Purpose: Keep every user-facing string in one place per locale.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! User-facing CLI strings live in per-locale catalogs. All runtime output is
//! routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The locale is chosen once per process.
//! - Missing keys fall back to English and then to the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Spanish.
    Es,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Parses a locale value, ignoring case and region tags (`es-MX`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next().unwrap_or("") {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }
}

/// Supported locales in presentation order.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Es];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Preformatted value.
    pub value: String,
}

impl MessageArg {
    /// Creates a message argument.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Process-wide locale.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "consent-flow {version}"),
    ("main.task_failed", "Command task failed: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.file_failed", "Failed to write {path}: {error}"),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    ("input.read_too_large", "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit})."),
    ("input.not_utf8", "{path} is not valid UTF-8."),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.valid", "Config is valid."),
    ("audit.path_missing", "audit.path is required when audit.sink = \"file\"."),
    ("audit.open_failed", "Failed to open audit log {path}: {error}"),
    ("api.base_url_missing", "api.base_url is not configured; account commands need a service."),
    ("api.client_failed", "Failed to initialize the API client: {error}"),
    ("catalog.load_failed", "Failed to load step catalog {path}: {error}"),
    ("catalog.unknown_type", "Unknown document type: {error}"),
    ("catalog.list.entry", "{key}\t{title} ({steps} steps)"),
    ("catalog.show.step", "Step {number}: {title}"),
    ("catalog.show.field", "  {id}\t{label}\t{kind}"),
    ("fill.rejected", "Form rejected: {error}"),
    ("fill.signature_invalid", "Signature {path} is not usable: {error}"),
    ("fill.date_invalid", "Invalid signing date {value}: {error}"),
    ("fill.render_failed", "Failed to render the document: {error}"),
    ("fill.written", "Wrote {path} ({pages} pages, {signatures} signatures)."),
    ("fill.placeholder", "Warning: {text}"),
    ("fill.save_failed", "Failed to save the document: {error}"),
    ("fill.saved", "Saved {title} as {id}."),
    ("documents.failed", "Document request failed: {error}"),
    ("documents.list.empty", "No saved documents."),
    ("documents.list.entry", "{id}\t{created}\t{title}"),
    ("documents.deleted", "Deleted {id}."),
    ("documents.not_found", "No saved document with id {id}."),
    ("documents.downloaded", "Wrote {path} ({pages} pages)."),
    ("templates.failed", "Template storage failed: {error}"),
    ("templates.list.empty", "No custom templates."),
    ("templates.list.entry", "{id}\t{name}"),
    ("templates.added", "Added template {name} as {id}."),
    ("templates.deleted", "Deleted template {id}."),
    ("auth.required", "Sign in first with `consent-flow auth login`."),
    ("auth.session_failed", "Failed to access the local session: {error}"),
    ("auth.login_failed", "Sign-in failed: {error}"),
    ("auth.login.ok", "Signed in as {email}."),
    ("auth.logout.ok", "Signed out {email}."),
    ("auth.status.signed_in", "Signed in as {email} ({id})."),
    ("auth.status.signed_out", "Not signed in."),
    ("auth.password_missing", "No password given; use --password-stdin or set {env}."),
    ("auth.password_read_failed", "Failed to read the password: {error}"),
    ("auth.password_too_long", "Password exceeds {limit} bytes."),
    ("credits.failed", "Credit request failed: {error}"),
    ("credits.balance", "Credits: {credits}"),
    ("credits.checkout", "Complete the purchase at: {url}"),
    ("credits.confirmed", "Purchase confirmed."),
    ("credits.confirmed.added", "Purchase confirmed; {added} credits added."),
    ("assistant.disabled", "The assistant is disabled; set assistant.enabled = true."),
    ("assistant.token_failed", "Failed to obtain an assistant key: {error}"),
    ("assistant.preview_failed", "Assistant preview failed: {error}"),
    ("assistant.preview_timeout", "Assistant preview timed out."),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'es'."),
    ("i18n.disclaimer.machine_translated", "Note: non-English output is machine-translated and may be inaccurate."),
];

/// Spanish catalog.
const CATALOG_ES: &[(&str, &str)] = &[
    ("main.version", "consent-flow {version}"),
    ("main.task_failed", "La tarea del comando falló: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "salida"),
    ("output.write_failed", "No se pudo escribir en {stream}: {error}"),
    ("output.file_failed", "No se pudo escribir {path}: {error}"),
    ("input.read_failed", "No se pudo leer {kind} en {path}: {error}"),
    ("input.read_too_large", "Se rechaza leer {kind} en {path} porque ocupa {size} bytes (límite {limit})."),
    ("input.not_utf8", "{path} no es UTF-8 válido."),
    ("config.load_failed", "No se pudo cargar la configuración: {error}"),
    ("config.valid", "La configuración es válida."),
    ("audit.path_missing", "audit.path es obligatorio cuando audit.sink = \"file\"."),
    ("audit.open_failed", "No se pudo abrir el registro de auditoría {path}: {error}"),
    ("api.base_url_missing", "api.base_url no está configurado; los comandos de cuenta necesitan un servicio."),
    ("api.client_failed", "No se pudo inicializar el cliente de la API: {error}"),
    ("catalog.load_failed", "No se pudo cargar el catálogo de pasos {path}: {error}"),
    ("catalog.unknown_type", "Tipo de documento desconocido: {error}"),
    ("catalog.list.entry", "{key}\t{title} ({steps} pasos)"),
    ("catalog.show.step", "Paso {number}: {title}"),
    ("catalog.show.field", "  {id}\t{label}\t{kind}"),
    ("fill.rejected", "Formulario rechazado: {error}"),
    ("fill.signature_invalid", "La firma {path} no se puede usar: {error}"),
    ("fill.date_invalid", "Fecha de firma no válida {value}: {error}"),
    ("fill.render_failed", "No se pudo generar el documento: {error}"),
    ("fill.written", "Se escribió {path} ({pages} páginas, {signatures} firmas)."),
    ("fill.placeholder", "Aviso: {text}"),
    ("fill.save_failed", "No se pudo guardar el documento: {error}"),
    ("fill.saved", "{title} guardado como {id}."),
    ("documents.failed", "La solicitud de documentos falló: {error}"),
    ("documents.list.empty", "No hay documentos guardados."),
    ("documents.list.entry", "{id}\t{created}\t{title}"),
    ("documents.deleted", "Se eliminó {id}."),
    ("documents.not_found", "No hay ningún documento guardado con id {id}."),
    ("documents.downloaded", "Se escribió {path} ({pages} páginas)."),
    ("templates.failed", "Falló el almacenamiento de plantillas: {error}"),
    ("templates.list.empty", "No hay plantillas personalizadas."),
    ("templates.list.entry", "{id}\t{name}"),
    ("templates.added", "Plantilla {name} añadida como {id}."),
    ("templates.deleted", "Se eliminó la plantilla {id}."),
    ("auth.required", "Inicia sesión primero con `consent-flow auth login`."),
    ("auth.session_failed", "No se pudo acceder a la sesión local: {error}"),
    ("auth.login_failed", "El inicio de sesión falló: {error}"),
    ("auth.login.ok", "Sesión iniciada como {email}."),
    ("auth.logout.ok", "Sesión cerrada para {email}."),
    ("auth.status.signed_in", "Sesión iniciada como {email} ({id})."),
    ("auth.status.signed_out", "No hay sesión iniciada."),
    ("auth.password_missing", "No se indicó contraseña; usa --password-stdin o define {env}."),
    ("auth.password_read_failed", "No se pudo leer la contraseña: {error}"),
    ("auth.password_too_long", "La contraseña supera {limit} bytes."),
    ("credits.failed", "La solicitud de créditos falló: {error}"),
    ("credits.balance", "Créditos: {credits}"),
    ("credits.checkout", "Completa la compra en: {url}"),
    ("credits.confirmed", "Compra confirmada."),
    ("credits.confirmed.added", "Compra confirmada; se añadieron {added} créditos."),
    ("assistant.disabled", "El asistente está desactivado; define assistant.enabled = true."),
    ("assistant.token_failed", "No se pudo obtener una clave del asistente: {error}"),
    ("assistant.preview_failed", "La vista previa del asistente falló: {error}"),
    ("assistant.preview_timeout", "La vista previa del asistente agotó el tiempo."),
    ("i18n.lang.invalid_env", "Valor no válido para {env}: {value}. Se esperaba 'en' o 'es'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la salida que no está en inglés es una traducción automática y puede ser inexacta.",
    ),
];

/// Returns the message catalog for the requested locale.
fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_ES_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Es => CATALOG_ES_MAP.get_or_init(|| CATALOG_ES.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` in the current locale, substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_in(current_locale(), key, args)
}

/// Translates `key` in `locale`, substituting `{name}` placeholders.
#[must_use]
pub fn translate_in(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        result = result.replace(&format!("{{{}}}", arg.key), &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::CATALOG_EN;
    use super::CATALOG_ES;
    use super::Locale;
    use super::MessageArg;
    use super::SUPPORTED_LOCALES;
    use super::translate_in;

    #[test]
    fn catalogs_cover_the_same_keys() {
        let en: BTreeSet<&str> = CATALOG_EN.iter().map(|(key, _)| *key).collect();
        let es: BTreeSet<&str> = CATALOG_ES.iter().map(|(key, _)| *key).collect();
        assert_eq!(en, es);
        assert_eq!(en.len(), CATALOG_EN.len(), "duplicate English keys");
    }

    #[test]
    fn placeholders_are_substituted() {
        let text = translate_in(Locale::Es, "credits.balance", vec![MessageArg::new("credits", "12")]);
        assert_eq!(text, "Créditos: 12");
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        assert_eq!(translate_in(Locale::Es, "no.such.key", Vec::new()), "no.such.key");
    }

    #[test]
    fn locale_parse_ignores_region_and_case() {
        assert_eq!(Locale::parse("ES-mx"), Some(Locale::Es));
        assert_eq!(Locale::parse(" en_GB "), Some(Locale::En));
        assert_eq!(Locale::parse("th"), None);
        assert_eq!(Locale::parse(""), None);
        for locale in SUPPORTED_LOCALES {
            assert_eq!(Locale::parse(locale.as_str()), Some(*locale));
        }
    }
}
