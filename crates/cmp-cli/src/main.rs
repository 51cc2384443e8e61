use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cmp_config::{EngineSettings, LoadedConfig, UnusedKeyPolicy};
use cmp_consent::{
    ConsentAction, ConsentEngine, ConsentState, EngineOptions, Resolution, SignalState,
    Staleness, StaticSignal,
};
use cmp_schemas::{
    parse_experience, validate_experience, ExperienceError, GroupKey, GvlSnapshot,
    PersistedPreference,
};
use cmp_tcf::TcfConsentSets;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cmp")]
#[command(about = "Consent reconciliation engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> region -> site...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Check an experience payload for conflicting or duplicated ids
    Validate {
        /// Experience payload (JSON)
        #[arg(long)]
        experience: String,
    },

    /// Resolve the initial consent state before any visitor action
    Init {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Apply one visitor action and print the record to persist
    Act {
        #[command(flatten)]
        engine: EngineArgs,

        #[arg(long, value_enum)]
        action: ActionArg,

        /// Ids toggled on (save only; repeatable)
        #[arg(long = "key")]
        keys: Vec<String>,

        /// Groups the action applies to (repeatable; required for save, default
        /// for accept/reject: every visible group)
        #[arg(long = "scope")]
        scopes: Vec<GroupKey>,

        /// Decision timestamp (RFC 3339). Defaults to now.
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Experience payload (JSON)
    #[arg(long)]
    experience: String,

    /// GVL snapshot (JSON); overrides the one embedded in the experience
    #[arg(long)]
    gvl: Option<String>,

    /// Stored consent record (JSON) from a previous visit
    #[arg(long)]
    prior: Option<String>,

    /// Global Privacy Control signal is active
    #[arg(long, default_value_t = false)]
    gpc: bool,

    /// Visitor region; overrides engine.region from config
    #[arg(long)]
    region: Option<String>,

    /// Layered config paths in merge order
    #[arg(long = "config")]
    config_paths: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Accept,
    Reject,
    Save,
}

/// Everything a loaded `EngineArgs` resolves to.
struct Loaded {
    config: LoadedConfig,
    engine: ConsentEngine,
    prior: Option<PersistedPreference>,
    signal: SignalState,
}

#[derive(Serialize)]
struct InitReport<'a> {
    config_hash: &'a str,
    history_id: &'a str,
    acknowledge_only: bool,
    signal: SignalState,
    staleness: &'a Staleness,
    enabled_ids: &'a ConsentState,
    outdated_preference_flags: BTreeMap<GroupKey, Vec<String>>,
    tcf: TcfConsentSets,
    gpc_proposal: Option<PersistedPreference>,
}

fn init_tracing() {
    // stdout carries JSON output only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = cmp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Validate { experience } => {
            let exp = read_experience(&experience)?;
            let issues = validate_experience(&exp);
            for issue in &issues {
                println!("issue={issue}");
            }
            if !issues.is_empty() {
                return Err(ExperienceError::Invalid(issues)).context(experience);
            }
            println!(
                "experience_ok=true history_id={} notices={} tcf={}",
                exp.history_id,
                exp.privacy_notices.len(),
                exp.is_tcf()
            );
        }

        Commands::Init { engine } => {
            let loaded = load_engine(&engine)?;
            let resolution = loaded
                .engine
                .initialize(loaded.prior.as_ref(), loaded.signal);
            let report = init_report(&loaded, &resolution, Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Act {
            engine,
            action,
            keys,
            scopes,
            now,
        } => {
            let now = parse_now(now.as_deref())?;
            let action = consent_action(action, keys, &scopes)?;

            let loaded = load_engine(&engine)?;
            let resolution = loaded
                .engine
                .initialize(loaded.prior.as_ref(), loaded.signal);
            let transition = loaded.engine.apply(&resolution.state, &action, &scopes);
            let record = loaded
                .engine
                .persist(&transition.state, transition.method, now);

            info!(
                method = record.consent_method.as_str(),
                history_id = %record.history_id,
                config_hash = %loaded.config.config_hash,
                "consent record ready"
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

fn init_report<'a>(
    loaded: &'a Loaded,
    resolution: &'a Resolution,
    now: DateTime<Utc>,
) -> InitReport<'a> {
    InitReport {
        config_hash: &loaded.config.config_hash,
        history_id: loaded.engine.history_id(),
        acknowledge_only: loaded.engine.is_acknowledge_only(),
        signal: resolution.signal,
        staleness: &resolution.staleness,
        enabled_ids: &resolution.state,
        outdated_preference_flags: resolution.outdated_flags(),
        tcf: loaded.engine.tcf_sets(&resolution.state),
        gpc_proposal: loaded.engine.gpc_proposal(resolution, now),
    }
}

/// Save keys are group-local ids, so a save must name the groups it targets.
fn consent_action(
    action: ActionArg,
    keys: Vec<String>,
    scopes: &[GroupKey],
) -> Result<ConsentAction> {
    match action {
        ActionArg::Accept | ActionArg::Reject if !keys.is_empty() => {
            bail!("--key is only valid with --action save")
        }
        ActionArg::Save if scopes.is_empty() => {
            bail!("--action save requires at least one --scope")
        }
        ActionArg::Accept => Ok(ConsentAction::AcceptAll),
        ActionArg::Reject => Ok(ConsentAction::RejectAll),
        ActionArg::Save => Ok(ConsentAction::Save { keys }),
    }
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now timestamp: {s}"))?
            .with_timezone(&Utc)),
    }
}

fn load_engine(args: &EngineArgs) -> Result<Loaded> {
    let config = if args.config_paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
        cmp_config::load_layered_yaml(&path_refs)?
    };
    cmp_config::report_unused_keys(&config.config_json, UnusedKeyPolicy::Warn)?;
    let settings = config.settings()?;

    let experience = read_experience(&args.experience)?;
    let options = engine_options(&settings, args.region.as_deref());

    let engine = match &args.gvl {
        Some(path) => {
            let raw: Value = read_json(path)?;
            let gvl = GvlSnapshot::from_value(&raw);
            ConsentEngine::with_gvl(&experience, gvl.as_ref(), options)
        }
        None => ConsentEngine::new(&experience, options),
    };
    if engine.catalog().is_empty() {
        warn!(experience = %args.experience, "experience has nothing to show for this region");
    }

    let prior: Option<PersistedPreference> = match &args.prior {
        Some(path) => Some(read_json(path).context("prior consent record")?),
        None => None,
    };

    let signal = SignalState::sample(&StaticSignal(args.gpc));

    Ok(Loaded {
        config,
        engine,
        prior,
        signal,
    })
}

fn engine_options(settings: &EngineSettings, region_override: Option<&str>) -> EngineOptions {
    EngineOptions {
        region: region_override
            .map(str::to_string)
            .or_else(|| settings.region.clone()),
        tcf_enabled: settings.tcf_enabled,
        honor_global_signal: settings.honor_global_privacy_control,
    }
}

fn read_experience(path: &str) -> Result<cmp_schemas::Experience> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read experience: {path}"))?;
    parse_experience(&raw).with_context(|| format!("failed to parse experience: {path}"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read json path: {path}"))?;
    serde_json::from_str(raw.trim_start_matches('\u{feff}'))
        .with_context(|| format!("invalid json: {path}"))
}
