//! In-memory capture of boundary events for tests
//!
//! One capture subscriber is installed per test binary. Tests run in
//! parallel against it, so lookups are scoped by operation plus entity key
//! (or entity type), which each test keeps unique to itself.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::schema::{
    FIELD_DURATION_MS, FIELD_ENTITY_KEY, FIELD_ENTITY_TYPE, FIELD_ERR_CODE, FIELD_EVENT, FIELD_OP,
};

/// One recorded event, fields rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    /// `start`, `end` or `end_error`
    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.field(FIELD_ENTITY_TYPE)
    }

    pub fn entity_key(&self) -> Option<&str> {
        self.field(FIELD_ENTITY_KEY)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.field(FIELD_DURATION_MS)?.parse().ok()
    }

    /// Whether any field value contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.fields.values().any(|v| v.contains(needle))
    }
}

#[derive(Default)]
struct FieldText(BTreeMap<String, String>);

impl Visit for FieldText {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    // Integers and bools reach here too; their Debug form is their text form.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldText::default();
        event.record(&mut fields);
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            fields: fields.0,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Shared handle onto the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    fn new() -> (CaptureLayer, Self) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            CaptureLayer {
                events: events.clone(),
            },
            Self { events },
        )
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of `op` on one entity key, oldest first
    pub fn for_key(&self, op: &str, key: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op) && e.entity_key() == Some(key))
    }

    /// Events of `op` on one entity type, oldest first
    pub fn for_type(&self, op: &str, entity_type: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op) && e.entity_type() == Some(entity_type))
    }

    /// Events of an operation with no entity context
    pub fn for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op))
    }

    /// The `event` names logged for `op` on `key`, in order
    pub fn lifecycle(&self, op: &str, key: &str) -> Vec<String> {
        self.for_key(op, key)
            .iter()
            .filter_map(|e| e.event().map(str::to_string))
            .collect()
    }

    /// Whether any captured field anywhere contains `needle`
    pub fn any_mentions(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.mentions(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn matching(&self, keep: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| keep(e)).collect()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture subscriber once and return its handle
///
/// # Example
///
/// ```
/// use claritydash_core::logging_facility::test_capture::init_test_capture;
/// use claritydash_core::{log_op_start, EntityKey, User};
///
/// let capture = init_test_capture();
/// let key = EntityKey::parse("doc@example.com").unwrap();
/// log_op_start!("entity_read", entity = User, key = &key);
/// assert_eq!(capture.lifecycle("entity_read", "doc@example.com"), vec!["start"]);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCapture::new();
            tracing_subscriber::registry().with(layer).init();
            capture
        })
        .clone()
}
