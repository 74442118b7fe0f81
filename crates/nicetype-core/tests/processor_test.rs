// NiceType Processor Tests
//
// Drive the input processor from a channel-fed source and observe the sink
// from the test thread.
//
// Run with: cargo test --test processor_test

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nicetype_core::{
    ChannelSource, InjectionError, InjectionSink, InputProcessor, KeyEvent, KeyEventSource, KeySender, Settings,
    SourceError, SourceResult, SubstitutionEngine,
};

// =========================================================================
// Test Helpers
// =========================================================================

/// Forwards every sink call to the test thread.
struct ReportingSink {
    report: Sender<String>,
}

impl InjectionSink for ReportingSink {
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("delete {}", count));
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("insert {}", text));
        Ok(())
    }

    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("left {}", count));
        Ok(())
    }
}

/// Types every injected key back into the source, the way a global key
/// hook sees synthetic input, and reports whether the source took it.
struct EchoingSink {
    echo: KeySender,
    report: Sender<String>,
}

impl EchoingSink {
    fn echo(&self, event: KeyEvent, label: &str) {
        let outcome = match self.echo.send(event) {
            Ok(true) => "queued",
            Ok(false) => "dropped",
            Err(_) => "closed",
        };
        let _ = self.report.send(format!("echo {} {}", label, outcome));
    }
}

impl InjectionSink for EchoingSink {
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("delete {}", count));
        for _ in 0..count {
            self.echo(KeyEvent::non_character(Instant::now()), "<backspace>");
        }
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("insert {}", text));
        for ch in text.chars() {
            self.echo(KeyEvent::character(ch, Instant::now()), &ch.to_string());
        }
        Ok(())
    }

    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
        let _ = self.report.send(format!("left {}", count));
        for _ in 0..count {
            self.echo(KeyEvent::non_character(Instant::now()), "<left>");
        }
        Ok(())
    }
}

/// Source that fails on its first poll
struct BrokenSource;

impl KeyEventSource for BrokenSource {
    fn poll_events(&mut self, _timeout: Duration) -> SourceResult<Vec<KeyEvent>> {
        Err(SourceError::Evdev("device vanished".to_string()))
    }
}

fn quiet_settings() -> Settings {
    let mut settings = Settings::new();
    settings.set_echo_settle(Duration::ZERO);
    settings
}

fn setup() -> (
    KeySender,
    Receiver<String>,
    InputProcessor<ChannelSource, ReportingSink>,
) {
    let (events, source) = ChannelSource::new();
    let (report, reports) = mpsc::channel();
    let engine = SubstitutionEngine::new(Arc::new(quiet_settings()), ReportingSink { report });
    (events, reports, InputProcessor::new(source, engine))
}

fn next_report(reports: &Receiver<String>) -> String {
    reports
        .recv_timeout(Duration::from_secs(2))
        .expect("sink call within two seconds")
}

// =========================================================================
// Ordering and Lifecycle
// =========================================================================

#[test]
fn test_events_reach_sink_in_order() {
    let (events, reports, mut processor) = setup();
    processor.start().unwrap();

    let t0 = Instant::now();
    for ch in ['(', '，', '，', '['] {
        events.send(KeyEvent::character(ch, t0)).unwrap();
    }

    let calls: Vec<String> = (0..6).map(|_| next_report(&reports)).collect();
    assert_eq!(
        calls,
        vec!["insert )", "left 1", "delete 2", "insert ,", "insert ]", "left 1"]
    );
    processor.stop();
}

#[test]
fn test_double_start_delivers_once() {
    let (events, reports, mut processor) = setup();
    processor.start().unwrap();
    processor.start().unwrap();

    events.send(KeyEvent::character('{', Instant::now())).unwrap();
    assert_eq!(next_report(&reports), "insert }");
    assert_eq!(next_report(&reports), "left 1");
    drop(events);
    processor.wait();
    assert!(reports.try_recv().is_err());
}

#[test]
fn test_stop_without_start() {
    let (_events, _reports, mut processor) = setup();
    processor.stop();
    assert!(!processor.is_running());
    assert!(processor.engine().is_some());
}

#[test]
fn test_restart_keeps_source() {
    let (events, reports, mut processor) = setup();
    processor.start().unwrap();
    processor.stop();

    // Queued while stopped; delivered after the restart.
    events.send(KeyEvent::character('(', Instant::now())).unwrap();
    processor.start().unwrap();
    assert_eq!(next_report(&reports), "insert )");
    processor.stop();
}

#[test]
fn test_source_error_stops_worker() {
    let engine = SubstitutionEngine::new(Arc::new(quiet_settings()), nicetype_core::DryRunSink::new());
    let mut processor = InputProcessor::new(BrokenSource, engine);
    processor.start().unwrap();
    processor.wait();
    assert!(!processor.is_running());
    processor.stop();
    assert!(processor.engine().is_some());
}

#[test]
fn test_drop_stops_worker() {
    let (events, _reports, mut processor) = setup();
    processor.start().unwrap();
    drop(processor);
    // The worker owned the receiving end; it is gone now.
    assert!(events.send(KeyEvent::non_character(Instant::now())).is_err());
}

// =========================================================================
// Settings Updates
// =========================================================================

#[test]
fn test_settings_update_between_events() {
    let (events, reports, mut processor) = setup();
    processor.start().unwrap();
    let t0 = Instant::now();

    events.send(KeyEvent::character('(', t0)).unwrap();
    assert_eq!(next_report(&reports), "insert )");
    assert_eq!(next_report(&reports), "left 1");

    let mut disabled = quiet_settings();
    disabled.set_auto_complete_enabled(false);
    processor.update_settings(Arc::new(disabled));

    events.send(KeyEvent::character('(', t0)).unwrap();
    events.send(KeyEvent::character('；', t0)).unwrap();
    events.send(KeyEvent::character('；', t0)).unwrap();
    assert_eq!(next_report(&reports), "delete 2");
    assert_eq!(next_report(&reports), "insert ;");

    drop(events);
    processor.wait();
    assert!(!processor.engine().unwrap().settings().is_auto_complete_enabled());
}

// =========================================================================
// Echo Suppression
// =========================================================================

#[test]
fn test_injected_keys_are_not_read_back() {
    let (events, source) = ChannelSource::new();
    let (report, reports) = mpsc::channel();
    let sink = EchoingSink {
        echo: events.clone(),
        report,
    };
    let engine = SubstitutionEngine::new(Arc::new(quiet_settings()), sink);
    let mut processor = InputProcessor::new(source, engine);
    processor.start().unwrap();
    let t0 = Instant::now();

    // Opening quote: the closer and the cursor move come back as echoes.
    events.send(KeyEvent::character('"', t0)).unwrap();
    assert_eq!(next_report(&reports), "insert \"");
    assert_eq!(next_report(&reports), "echo \" dropped");
    assert_eq!(next_report(&reports), "left 1");
    assert_eq!(next_report(&reports), "echo <left> dropped");

    // The user's own closing quote still finds the pair open: nothing typed.
    events.send(KeyEvent::character('"', t0)).unwrap();
    // Conversion echoes a backspace pair and the replacement.
    events.send(KeyEvent::character('，', t0)).unwrap();
    events.send(KeyEvent::character('，', t0)).unwrap();
    assert_eq!(next_report(&reports), "delete 2");
    assert_eq!(next_report(&reports), "echo <backspace> dropped");
    assert_eq!(next_report(&reports), "echo <backspace> dropped");
    assert_eq!(next_report(&reports), "insert ,");
    assert_eq!(next_report(&reports), "echo , dropped");

    processor.stop();
    assert!(reports.try_recv().is_err());

    let state = processor.engine().unwrap().state();
    assert_eq!(state.last_char(), None);
    assert_eq!(state.last_self_paired(), None);
}

#[test]
fn test_self_pair_marker_survives_echo() {
    let (events, source) = ChannelSource::new();
    let (report, reports) = mpsc::channel();
    let sink = EchoingSink {
        echo: events.clone(),
        report,
    };
    let engine = SubstitutionEngine::new(Arc::new(quiet_settings()), sink);
    let mut processor = InputProcessor::new(source, engine);
    processor.start().unwrap();

    events.send(KeyEvent::character('"', Instant::now())).unwrap();
    for _ in 0..4 {
        next_report(&reports);
    }
    processor.stop();

    let state = processor.engine().unwrap().state();
    assert_eq!(state.last_char(), Some('"'));
    assert_eq!(state.last_self_paired(), Some('"'));
    assert!(reports.try_recv().is_err());
}
