//! Per-browser session state for the web form.
//!
//! Each session caches the extracted context and the generated script so that
//! re-rendering the page never calls the model again. The session lock is
//! only held to read or store state, never while the loader or the model run.

use parking_lot::Mutex;
use pptscript_core::{
    build_context, ChatModel, Config, ContentExtractor, DocumentLoader, Error, LoadMode,
    PresentationFormat, Result, ScriptGenerator, DEFAULT_QUESTION, SUPPORTED_MODELS,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Oldest sessions are dropped beyond this many.
const MAX_SESSIONS: usize = 256;

/// An uploaded deck on disk. The file is deleted once the session and any
/// running generation have let go of it.
#[derive(Debug)]
pub struct UploadedDeck {
    file: Arc<NamedTempFile>,
    name: String,
}

impl UploadedDeck {
    /// Original filename as sent by the browser.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the upload is stored.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// A snapshot of what one "Generate Script" click works on.
#[derive(Debug)]
pub struct GenerationJob {
    id: u64,
    deck: Arc<NamedTempFile>,
    config: Config,
}

impl GenerationJob {
    /// Extract the deck and flatten it into the model context.
    pub fn extract(&self, loader: &dyn DocumentLoader) -> Result<String> {
        let extractor = ContentExtractor::new(loader).with_verbose(self.config.verbose);
        let pages = extractor.extract(self.deck.path(), LoadMode::Elements)?;
        Ok(build_context(&pages)?.context)
    }

    /// Ask the model for a script with the settings captured at click time.
    pub fn generate(&self, model: &dyn ChatModel, context: &str) -> Result<String> {
        ScriptGenerator::new(model, &self.config).generate_script(context, DEFAULT_QUESTION)
    }
}

/// Everything the page shows for one browser session.
#[derive(Debug)]
pub struct SessionState {
    config: Config,
    upload: Option<UploadedDeck>,
    context: Option<String>,
    script: Option<String>,
    banner: Option<String>,
    /// Id of the generation whose results this session still wants.
    in_flight: Option<u64>,
    last_job: u64,
}

impl SessionState {
    /// Start a session from the process-wide defaults.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            upload: None,
            context: None,
            script: None,
            banner: None,
            in_flight: None,
            last_job: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn upload(&self) -> Option<&UploadedDeck> {
        self.upload.as_ref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// Whether a generation is running for this session.
    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record an error to show on the next render.
    pub fn set_error(&mut self, error: &Error) {
        log::warn!("Session error: {}", error);
        self.banner = Some(format!("An error occurred: {}", error));
    }

    /// Remove and return the pending banner.
    pub fn take_banner(&mut self) -> Option<String> {
        self.banner.take()
    }

    /// Forget cached results, keeping the upload and settings. A running
    /// generation is abandoned.
    fn clear_results(&mut self) {
        self.context = None;
        self.script = None;
        self.in_flight = None;
    }

    /// Store a new upload, replacing (and deleting) any previous one.
    pub fn store_upload(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        let format = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(PresentationFormat::from_extension);
        if format.is_none() {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a .pptx file",
                filename
            )));
        }

        let mut file = tempfile::Builder::new()
            .prefix("pptscript-")
            .suffix(".pptx")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        log::info!("Stored upload {} ({} bytes)", filename, bytes.len());
        self.upload = Some(UploadedDeck {
            file: Arc::new(file),
            name: filename.to_string(),
        });
        self.clear_results();
        Ok(())
    }

    /// Apply model and temperature from the sidebar.
    ///
    /// Changing either clears cached results.
    pub fn update_settings(&mut self, model: &str, temperature: f32) -> Result<()> {
        if !SUPPORTED_MODELS.contains(&model) {
            return Err(Error::InvalidInput(format!("unsupported model '{}'", model)));
        }
        let updated = self.config.clone().with_model(model).with_temperature(temperature)?;
        if updated != self.config {
            self.config = updated;
            self.clear_results();
        }
        Ok(())
    }

    /// Capture the upload and settings for a new generation. Any earlier
    /// generation still running is superseded.
    pub fn begin_generation(&mut self) -> Result<GenerationJob> {
        let deck = self
            .upload
            .as_ref()
            .map(|u| Arc::clone(&u.file))
            .ok_or_else(|| {
                Error::InvalidInput("Please upload a PowerPoint file to start!".to_string())
            })?;

        self.last_job += 1;
        self.in_flight = Some(self.last_job);
        Ok(GenerationJob {
            id: self.last_job,
            deck,
            config: self.config.clone(),
        })
    }

    fn is_current(&self, job: &GenerationJob) -> bool {
        self.in_flight == Some(job.id)
    }

    /// Cache the extracted context and drop any older script.
    ///
    /// Returns the context to generate from, or `None` when the job was
    /// superseded while extracting.
    pub fn finish_extraction(
        &mut self,
        job: &GenerationJob,
        extracted: Result<String>,
    ) -> Result<Option<String>> {
        if !self.is_current(job) {
            return Ok(None);
        }
        match extracted {
            Ok(context) => {
                self.context = Some(context.clone());
                self.script = None;
                Ok(Some(context))
            }
            Err(e) => {
                self.in_flight = None;
                Err(e)
            }
        }
    }

    /// Cache the generated script unless the job was superseded.
    pub fn finish_generation(&mut self, job: &GenerationJob, generated: Result<String>) -> Result<()> {
        if !self.is_current(job) {
            return Ok(());
        }
        self.in_flight = None;
        self.script = Some(generated?);
        Ok(())
    }
}

/// Handle a click on "Generate Script".
///
/// Re-extracts the upload, caches the context, then generates once. The lock
/// is released while the loader and the model run. A failed generation keeps
/// the freshly extracted context.
pub fn run_generation(
    session: &Mutex<SessionState>,
    loader: &dyn DocumentLoader,
    model: &dyn ChatModel,
) -> Result<()> {
    let job = session.lock().begin_generation()?;

    let extracted = job.extract(loader);
    let Some(context) = session.lock().finish_extraction(&job, extracted)? else {
        log::debug!("Generation {} superseded during extraction", job.id);
        return Ok(());
    };

    let generated = job.generate(model, &context);
    session.lock().finish_generation(&job, generated)
}

struct Entry {
    state: Arc<Mutex<SessionState>>,
    created: Instant,
}

/// All live sessions, keyed by cookie id.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    defaults: Config,
}

impl SessionStore {
    /// Create an empty store; new sessions start from `defaults`.
    pub fn new(defaults: Config) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            defaults,
        }
    }

    /// Look up a session, creating one when the id is missing or unknown.
    ///
    /// Returns the id, the session and whether it was just created.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<SessionState>>, bool) {
        let mut sessions = self.sessions.lock();

        if let Some(id) = id {
            if let Some(entry) = sessions.get(&id) {
                return (id, Arc::clone(&entry.state), false);
            }
        }

        if sessions.len() >= MAX_SESSIONS {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.created)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
            }
        }

        let id = Uuid::new_v4();
        let state = Arc::new(Mutex::new(SessionState::new(self.defaults.clone())));
        sessions.insert(
            id,
            Entry {
                state: Arc::clone(&state),
                created: Instant::now(),
            },
        );
        log::debug!("Created session {}", id);
        (id, state, true)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
