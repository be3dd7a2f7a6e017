//! CLI command implementations

use crate::output::{seconds, OutputFormat, OutputManager};
use anyhow::Context;
use omniplay_core::{
    can_play_src, parse as parse_source,
    sim::{network_error_code, SimBackends, SimCall, SimScript},
    AttemptRecord, BackendKind, Candidate, EventHub, FallbackCoordinator, MediaConfig,
    MediaElement, MediaEvent, MediaType, ParseOptions, Quality, QualityLevel,
};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

fn parse_options(audio: bool, time_fragments: bool) -> ParseOptions {
    ParseOptions {
        media_type: if audio { MediaType::Audio } else { MediaType::Video },
        time_fragments,
    }
}

fn backend_kinds(names: &[String]) -> anyhow::Result<Vec<BackendKind>> {
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse::<BackendKind>().map_err(anyhow::Error::from))
        .collect()
}

fn parse_quality(value: &str) -> anyhow::Result<Quality> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(Quality::Auto);
    }
    let index = value
        .parse::<usize>()
        .with_context(|| format!("quality must be 'auto' or a level index, got '{}'", value))?;
    Ok(Quality::Level(index))
}

// ============================================================================
// Probe
// ============================================================================

#[derive(Serialize)]
struct ProbeReport<'a> {
    src: &'a str,
    can_play: &'static str,
}

/// Report whether any candidate of a source is playable
pub fn probe(out: &OutputManager, src: &str, audio: bool) -> anyhow::Result<()> {
    let verdict = can_play_src(src, &parse_options(audio, true));
    let can_play = match verdict.as_str() {
        "" => "no",
        other => other,
    };

    match out.format() {
        OutputFormat::Json => println!("{}", out.json(&ProbeReport { src, can_play })?),
        OutputFormat::Text | OutputFormat::Table => println!("{}", can_play),
    }
    Ok(())
}

// ============================================================================
// Parse
// ============================================================================

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "#")]
    index: usize,
    kind: String,
    backend: String,
    mime: String,
    start: String,
    end: String,
    uri: String,
}

impl From<&Candidate> for CandidateRow {
    fn from(candidate: &Candidate) -> Self {
        Self {
            index: candidate.index,
            kind: candidate.kind.to_string(),
            backend: candidate
                .kind
                .backend()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "-".to_string()),
            mime: candidate.mime_type.unwrap_or("-").to_string(),
            start: seconds(candidate.start_offset),
            end: seconds(candidate.end_offset),
            uri: candidate.uri.clone(),
        }
    }
}

/// Classify every candidate of a source
pub fn parse(out: &OutputManager, src: &str, audio: bool, time_fragments: bool) -> anyhow::Result<()> {
    let spec = parse_source(src, &parse_options(audio, time_fragments));

    match out.format() {
        OutputFormat::Json => println!("{}", out.json(&spec)?),
        OutputFormat::Table => println!("{}", out.table(spec.candidates.iter().map(CandidateRow::from))),
        OutputFormat::Text => {
            println!("{}", out.heading("Candidates:"));
            for candidate in &spec.candidates {
                let row = CandidateRow::from(candidate);
                println!(
                    "  {}. {} [{}] {}",
                    row.index + 1,
                    out.value(&row.uri),
                    row.kind,
                    row.mime
                );
                if candidate.start_offset.is_some() {
                    println!("     {}", out.field("Range", format!("{} - {}", row.start, row.end)));
                }
            }
            println!();
            println!("{}", out.field("Supported", spec.is_supported()));
            println!("{}", out.field("Streaming manifest", spec.has_manifest()));
            if let Some(last) = spec.last_resort() {
                println!("{}", out.field("Last resort", &last.uri));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Tabled, Serialize)]
struct PlanRow {
    #[tabled(rename = "#")]
    step: usize,
    backend: BackendKind,
    uri: String,
    last_resort: bool,
    /// Backend offers a selectable quality ladder
    qualities: bool,
}

/// Show the order backends would be attempted in
pub fn plan(out: &OutputManager, src: &str, audio: bool, only: &[String]) -> anyhow::Result<()> {
    let available = backend_kinds(only)?;
    let spec = parse_source(src, &parse_options(audio, true));
    let coordinator = FallbackCoordinator::new(&spec, |kind| available.is_empty() || available.contains(&kind));

    let rows: Vec<PlanRow> = coordinator
        .plan()
        .iter()
        .enumerate()
        .map(|(step, attempt)| PlanRow {
            step: step + 1,
            backend: attempt.backend,
            uri: attempt.candidate.uri.clone(),
            last_resort: attempt.last_resort,
            qualities: attempt.backend.has_quality_levels(),
        })
        .collect();

    match out.format() {
        OutputFormat::Json => println!("{}", out.json(&rows)?),
        OutputFormat::Table => println!("{}", out.table(rows)),
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("{}", out.failure("No playable candidate"));
                return Ok(());
            }
            println!("{}", out.heading("Fallback plan:"));
            for row in &rows {
                let marker = if row.last_resort { " (last resort)" } else { "" };
                println!("  {}. {} {}{}", row.step, out.key(&row.backend.to_string()), row.uri, marker);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Simulate
// ============================================================================

/// Injected behavior and host actions for one simulated session
pub struct Scenario {
    pub audio: bool,
    pub fail: Vec<String>,
    pub fail_load: Vec<String>,
    pub unsupported: Vec<String>,
    pub native_hls: bool,
    pub duration: f64,
    pub autoplay: bool,
    pub seek: Option<f64>,
    pub quality: Option<String>,
    pub volume: Option<f64>,
    pub mute: bool,
}

impl Scenario {
    fn backends(&self) -> anyhow::Result<SimBackends> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            anyhow::bail!("duration must be a positive number of seconds");
        }
        let sim = SimBackends::with_script(SimScript {
            duration: self.duration,
            ..Default::default()
        });
        for kind in backend_kinds(&self.fail)? {
            sim.fail_playback(kind, network_error_code(kind));
        }
        for kind in backend_kinds(&self.fail_load)? {
            sim.fail_load(kind);
        }
        for kind in backend_kinds(&self.unsupported)? {
            sim.set_unsupported(kind);
        }
        sim.set_native_hls(self.native_hls);
        Ok(sim)
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "seq")]
    sequence: u64,
    event: String,
    ready: String,
    time: String,
    duration: String,
    paused: bool,
}

impl From<&MediaEvent> for EventRow {
    fn from(event: &MediaEvent) -> Self {
        Self {
            sequence: event.sequence,
            event: event.event.to_string(),
            ready: event.state.ready_state.to_string(),
            time: seconds(Some(event.state.current_time)),
            duration: seconds(Some(event.state.duration)),
            paused: event.state.paused,
        }
    }
}

#[derive(Serialize)]
struct SimulationReport {
    src: String,
    active_backend: Option<BackendKind>,
    current_src: String,
    phase: String,
    error: Option<String>,
    attempts: Vec<AttemptRecord>,
    qualities: Vec<QualityLevel>,
    events: Vec<MediaEvent>,
    calls: Vec<SimCall>,
    warnings: Vec<String>,
}

/// Everything still buffered in the receiver, plus how many were lost to lag
fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> (Vec<T>, u64) {
    let mut events = Vec::new();
    let mut missed = 0;
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log receiver lagged");
                missed += skipped;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    (events, missed)
}

/// Play a source against scripted backends
pub async fn simulate(out: &OutputManager, src: &str, scenario: Scenario) -> anyhow::Result<()> {
    let sim = scenario.backends()?;
    let quality = scenario.quality.as_deref().map(parse_quality).transpose()?;
    let base = if scenario.audio {
        MediaConfig::audio()
    } else {
        MediaConfig::default()
    };
    let config = MediaConfig {
        autoplay: scenario.autoplay,
        ..base
    };

    let element = MediaElement::with_hub(config, sim.activator(), Arc::new(EventHub::new()));
    let mut rx = element
        .subscribe()
        .context("event namespace was not registered")?;

    element.set_src(src).await?;
    let handled = element.process_signals().await;
    debug!(handled, backend = ?element.active_backend(), "Source resolved");

    let mut warnings = Vec::new();
    if let Some(volume) = scenario.volume {
        if let Err(err) = element.set_volume(volume) {
            warnings.push(format!("set_volume: {}", err));
        }
    }
    if scenario.mute {
        if let Err(err) = element.set_muted(true) {
            warnings.push(format!("set_muted: {}", err));
        }
    }
    if let Some(quality) = quality {
        if let Err(err) = element.set_quality(quality) {
            warnings.push(format!("set_quality: {}", err));
        }
    }
    if let Some(time) = scenario.seek {
        if let Err(err) = element.set_current_time(time) {
            warnings.push(format!("seek: {}", err));
        }
    }
    element.process_signals().await;

    let (events, missed) = drain(&mut rx);
    if missed > 0 {
        warnings.push(format!("event log lost {} events", missed));
    }

    let report = SimulationReport {
        src: src.to_string(),
        active_backend: element.active_backend(),
        current_src: element.current_src(),
        phase: element.phase().to_string(),
        error: element.error().map(|err| err.to_string()),
        attempts: element.attempts(),
        qualities: element.qualities().levels().to_vec(),
        events,
        calls: sim.calls(),
        warnings,
    };
    element.dispose();

    match out.format() {
        OutputFormat::Json => println!("{}", out.json(&report)?),
        OutputFormat::Table => {
            println!("{}", out.table(report.events.iter().map(EventRow::from)));
            print_summary(out, &report);
        }
        OutputFormat::Text => {
            println!("{}", out.heading("Events:"));
            for event in &report.events {
                let row = EventRow::from(event);
                println!(
                    "  {:>3} {:<16} {} t={} d={}",
                    row.sequence,
                    out.value(&row.event),
                    row.ready,
                    row.time,
                    row.duration
                );
            }
            println!();
            print_summary(out, &report);
        }
    }

    if report.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(out: &OutputManager, report: &SimulationReport) {
    println!("{}", out.heading("Session:"));
    println!(
        "{}",
        out.field(
            "Backend",
            report
                .active_backend
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    );
    if !report.current_src.is_empty() {
        println!("{}", out.field("Playing", &report.current_src));
    }
    println!("{}", out.field("Phase", &report.phase));

    if !report.attempts.is_empty() {
        println!("{}", out.heading("Attempts:"));
        for (i, attempt) in report.attempts.iter().enumerate() {
            let outcome = match attempt.failure {
                Some(kind) => out.failure(&kind.to_string()),
                None => out.value("ok"),
            };
            println!("  {}. {} {} {}", i + 1, attempt.backend, attempt.uri, outcome);
        }
    }

    if !report.qualities.is_empty() {
        let labels: Vec<&str> = report.qualities.iter().map(|level| level.label.as_str()).collect();
        println!("{}", out.field("Qualities", labels.join(", ")));
    }

    for warning in &report.warnings {
        println!("  {} {}", out.failure("warning:"), warning);
    }
    if let Some(error) = &report.error {
        println!("  {} {}", out.failure("error:"), error);
    }
}
