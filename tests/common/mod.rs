#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use assetpipe::errors::TransformError;
use assetpipe::pipeline::{BuildOutput, Category, CategoryWorker, PathSpec, Transform};
use assetpipe::serve::DevServer;
use assetpipe::watch::CategorySources;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Uses `with_test_writer()`, so logs are captured per-test; the Rust test
/// harness only prints captured output for failing tests (unless you run
/// with `-- --nocapture`).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Shared journal of observable pipeline events, in arrival order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// A fake transform that:
/// - records each run's input set (and the first input's contents at run time)
/// - optionally sleeps, to hold the category in its Building state
/// - optionally fails, to exercise failure isolation.
pub struct FakeTransform {
    category: Category,
    journal: Journal,
    runs: Mutex<Vec<Vec<PathBuf>>>,
    contents_seen: Mutex<Vec<String>>,
    delay: Duration,
    fail: bool,
}

impl FakeTransform {
    pub fn new(category: Category, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            category,
            journal,
            runs: Mutex::new(Vec::new()),
            contents_seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail: false,
        })
    }

    pub fn with_delay(category: Category, journal: Journal, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::plain(category, journal)
        })
    }

    pub fn failing(category: Category, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::plain(category, journal)
        })
    }

    fn plain(category: Category, journal: Journal) -> Self {
        Self {
            category,
            journal,
            runs: Mutex::new(Vec::new()),
            contents_seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn runs(&self) -> Vec<Vec<PathBuf>> {
        self.runs.lock().unwrap().clone()
    }

    /// Contents of the first input file, as observed at the start of each run.
    pub fn contents_seen(&self) -> Vec<String> {
        self.contents_seen.lock().unwrap().clone()
    }
}

impl Transform for FakeTransform {
    fn run(&self, inputs: &[PathBuf]) -> Result<BuildOutput, TransformError> {
        if let Some(first) = inputs.first() {
            let contents = fs::read_to_string(first).unwrap_or_default();
            self.contents_seen.lock().unwrap().push(contents);
        }

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        self.runs.lock().unwrap().push(inputs.to_vec());

        if self.fail {
            self.journal
                .lock()
                .unwrap()
                .push(format!("failed:{}", self.category));
            return Err(TransformError::for_category(self.category, "injected failure"));
        }

        self.journal
            .lock()
            .unwrap()
            .push(format!("built:{}", self.category));
        Ok(BuildOutput::default())
    }
}

/// A fake dev server that records `start` and `reload` calls in the journal.
pub struct FakeDevServer {
    journal: Journal,
}

impl FakeDevServer {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self { journal })
    }
}

impl DevServer for FakeDevServer {
    fn start(&self, _root: &Path) -> assetpipe::errors::Result<()> {
        self.journal.lock().unwrap().push("start".to_string());
        Ok(())
    }

    fn reload(&self) {
        self.journal.lock().unwrap().push("reload".to_string());
    }
}

/// Build a worker for a category over a real source matcher plus the given
/// (usually fake) transform.
pub fn worker(
    category: Category,
    spec: &PathSpec,
    root: &Path,
    transform: Arc<dyn Transform>,
) -> CategoryWorker {
    CategoryWorker {
        transform,
        sources: CategorySources::from_spec(category, spec, root).expect("valid spec"),
    }
}

pub fn spec(src: &str, dest: &str, watch: &str) -> PathSpec {
    PathSpec {
        src: src.to_string(),
        dest: PathBuf::from(dest),
        watch: watch.to_string(),
        exclude: None,
    }
}

/// Write a file, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}
