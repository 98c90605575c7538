// Centralized logging setup: console + optional JSON file output, runtime log levels, span timing
use std::env;
use std::fs;
use tracing_subscriber::{
    fmt,
    EnvFilter,
    layer::{SubscriberExt, Layer, Context},
    util::SubscriberInitExt
};
use tracing::{Id, Subscriber, span, field::Field, field::Visit, debug};
use std::time::{Instant, Duration};
use std::sync::OnceLock; // For global file guard

const CRATE_TARGET: &str = "portfolio_analysis_engine";

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init_logging(bin_name: String) -> eyre::Result<()> {
    // Log levels for console and file, read from env
    let console_log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let file_log_level = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let log_to_file = env::var("LOG_TO_FILE").unwrap_or_else(|_| "false".to_string()) == "true";

    // Everything else at warn, our crate and the running binary at the configured level
    let env_filter_console = build_filter(&bin_name, &console_log_level);
    let env_filter_file = build_filter(&bin_name, &file_log_level);

    let console_layer = fmt::Layer::new()
        .pretty()
        .with_filter(env_filter_console);

    let timing_layer = SpanTimingLayer;

    if log_to_file {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let log_dir = std::path::Path::new("logs");
        fs::create_dir_all(log_dir)?;
        let log_file_name = format!("{}_{}.log", bin_name, timestamp);

        let file_appender = tracing_appender::rolling::never(log_dir, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD.set(guard).ok();

        // File layer: structured JSON logs with UTC timestamps
        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(env_filter_file);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .with(timing_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(timing_layer)
            .try_init()?;
    }
    Ok(())
}

fn build_filter(bin_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("warn,{}={},{}={}", CRATE_TARGET, level, bin_name, level))
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", CRATE_TARGET)))
}

// Records busy/idle time for spans opened with `on_close = true` and reports it when they close
struct SpanTimingLayer;

struct StartInstant(Instant);
struct LastInstant(Instant);
struct BusyTime(Duration);
struct IdleTime(Duration);

struct OnCloseVisitor<'a> {
    on_close: &'a mut bool,
}

impl Visit for OnCloseVisitor<'_> {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "on_close" {
            *self.on_close = value;
        }
    }
    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S> Layer<S> for SpanTimingLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut on_close = false;
        attrs.record(&mut OnCloseVisitor { on_close: &mut on_close });
        if on_close {
            let mut extensions = span.extensions_mut();
            let now = Instant::now();
            extensions.insert(StartInstant(now));
            extensions.insert(LastInstant(now));
            extensions.insert(BusyTime(Duration::ZERO));
            extensions.insert(IdleTime(Duration::ZERO));
        }
    }

    // Time between exit and the next enter is idle; time inside the span is busy
    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut exts = span.extensions_mut();
        let Some(LastInstant(last)) = exts.remove::<LastInstant>() else { return };
        let idle = exts.remove::<IdleTime>().map(|it| it.0).unwrap_or(Duration::ZERO);
        exts.insert(IdleTime(idle + last.elapsed()));
        exts.insert(LastInstant(Instant::now()));
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut exts = span.extensions_mut();
        let Some(LastInstant(last)) = exts.remove::<LastInstant>() else { return };
        let busy = exts.remove::<BusyTime>().map(|bt| bt.0).unwrap_or(Duration::ZERO);
        exts.insert(BusyTime(busy + last.elapsed()));
        exts.insert(LastInstant(Instant::now()));
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let mut exts = span.extensions_mut();
        if let Some(StartInstant(start)) = exts.remove::<StartInstant>() {
            let busy_time = exts.remove::<BusyTime>().map(|bt| bt.0).unwrap_or(Duration::ZERO);
            let idle_time = exts.remove::<IdleTime>().map(|it| it.0).unwrap_or(Duration::ZERO);
            debug!(
                span = span.name(),
                busy_time = ?busy_time,
                idle_time = ?idle_time,
                total_time = ?start.elapsed(),
                "span closed"
            );
        }
    }
}
