/*
 * This file is part of smcfan.
 *
 * Copyright (C) 2025 smcfan contributors
 *
 * smcfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * smcfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with smcfan. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smcfan::constants::temperature::celsius_to_fahrenheit;
use smcfan::{
    load_config, load_config_from, Key, KeyInfoCache, Metric, Smc, SmcConfig, SmcConnection,
    SmcError,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "\
usage: smcfan [--config PATH] [--log-level LEVEL] [--json] COMMAND

commands:
  read KEY          read a key and decode it by its type
  temp KEY          read a temperature key (sp78)
  rpm KEY           read a fan speed key (fpe2)
  set-rpm KEY RPM   write a fan speed key (requires root)
  snapshot          read every configured sensor";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Read(Key),
    Temp(Key),
    Rpm(Key),
    SetRpm(Key, u32),
    Snapshot,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
struct Cli {
    command: Command,
    config: Option<PathBuf>,
    log_level: String,
    json: bool,
}

fn parse_key(arg: Option<&String>) -> anyhow::Result<Key> {
    let s = arg.ok_or_else(|| anyhow!("missing KEY argument"))?;
    Ok(Key::new(s)?)
}

fn parse_args(args: &[String]) -> anyhow::Result<Cli> {
    let mut config = None;
    let mut log_level = "warn".to_string();
    let mut json = false;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config = Some(PathBuf::from(path));
            }
            "--log-level" => {
                let level = iter.next().ok_or_else(|| anyhow!("--log-level needs a level"))?;
                log_level = level.clone();
            }
            "--json" => json = true,
            "-h" | "--help" => positional = vec!["help".to_string()],
            other if other.starts_with("--") => bail!("unknown option {}", other),
            other => positional.push(other.to_string()),
        }
    }

    let command = match positional.first().map(|s| s.as_str()) {
        None | Some("help") => Command::Help,
        Some("read") => Command::Read(parse_key(positional.get(1))?),
        Some("temp") => Command::Temp(parse_key(positional.get(1))?),
        Some("rpm") => Command::Rpm(parse_key(positional.get(1))?),
        Some("set-rpm") => {
            let key = parse_key(positional.get(1))?;
            let rpm = positional
                .get(2)
                .ok_or_else(|| anyhow!("missing RPM argument"))?
                .parse::<u32>()
                .context("RPM must be a non-negative integer")?;
            Command::SetRpm(key, rpm)
        }
        Some("snapshot") => Command::Snapshot,
        Some(other) => bail!("unknown command {}\n\n{}", other, USAGE),
    };

    Ok(Cli { command, config, log_level, json })
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn load(cli: &Cli) -> anyhow::Result<SmcConfig> {
    let cfg = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => load_config().context("failed to load config")?,
    };
    Ok(cfg)
}

fn require_root(euid: libc::uid_t) -> Result<(), SmcError> {
    if euid != 0 {
        return Err(SmcError::PermissionDenied(
            "writing controller keys requires root privileges".to_string(),
        ));
    }
    Ok(())
}

/// Combine the command result with the close result. A failed command wins
/// over a failed close.
fn finish(result: anyhow::Result<()>, closed: smcfan::Result<()>) -> anyhow::Result<()> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "failed to close the controller");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed.context("failed to close the controller"),
    }
}

fn run(cli: &Cli, cfg: &SmcConfig, smc: &Smc<SmcConnection>) -> anyhow::Result<()> {
    match &cli.command {
        Command::Read(key) => {
            let (raw, value) = smc.read_decoded(*key)?;
            if cli.json {
                println!("{}", serde_json::json!({
                    "key": key,
                    "data_type": raw.data_type,
                    "data_size": raw.data_size,
                    "value": value,
                }));
            } else {
                println!("{} [{}] {} bytes: {}", key, raw.data_type, raw.data_size, value);
            }
        }
        Command::Temp(key) => {
            let celsius = smc.read_temperature(*key)?;
            if cfg.fans.metric == Metric::F {
                println!("{:.2} °F", celsius_to_fahrenheit(celsius));
            } else {
                println!("{:.2} °C", celsius);
            }
        }
        Command::Rpm(key) => {
            println!("{}", smc.read_fan_rpm(*key)?);
        }
        Command::SetRpm(key, rpm) => {
            // SAFETY: geteuid has no preconditions and cannot fail.
            require_root(unsafe { libc::geteuid() })?;
            smc.set_fan_rpm(*key, *rpm)?;
            info!(%key, rpm, "fan speed written");
            println!("{} set to {} rpm", key, rpm);
        }
        Command::Snapshot => {
            let mut snapshot = smc.snapshot(&cfg.keys);
            if cfg.fans.metric == Metric::F {
                snapshot = snapshot.to_fahrenheit();
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot, cfg.fans.metric);
            }
        }
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}

fn print_snapshot(s: &smcfan::Snapshot, metric: Metric) {
    let unit = if metric == Metric::F { "°F" } else { "°C" };
    let t = |v: Option<f64>| v.map(|c| format!("{:.2} {}", c, unit)).unwrap_or_else(|| "-".into());
    let r = |v: Option<u32>| v.map(|x| format!("{} rpm", x)).unwrap_or_else(|| "-".into());

    println!("CPU A            {}", t(s.cpu_a_temp));
    println!("CPU A heatsink   {}", t(s.cpu_a_heatsink_temp));
    println!("CPU B            {}", t(s.cpu_b_temp));
    println!("CPU B heatsink   {}", t(s.cpu_b_heatsink_temp));
    println!("Northbridge      {}", t(s.northbridge_temp));
    println!("Northbridge HS   {}", t(s.northbridge_heatsink_temp));
    println!("Ambient          {}", t(s.ambient_temp));
    println!("Intake fan       {} (min {})", r(s.intake_fan_rpm), r(s.intake_min_speed));
    println!("CPU A fan        {} (min {})", r(s.cpu_a_fan_rpm), r(s.cpu_a_min_speed));
    println!("CPU B fan        {} (min {})", r(s.cpu_b_fan_rpm), r(s.cpu_b_min_speed));
    println!("Exhaust fan      {}", r(s.exhaust_fan_rpm));
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if cli.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    init_tracing(&cli.log_level);
    info!("smcfan {} starting", VERSION);

    let cfg = load(&cli)?;
    let conn = SmcConnection::open().context("failed to open the controller")?;
    let smc = Smc::with_cache(conn, KeyInfoCache::with_capacity(cfg.cache_capacity));

    let result = run(&cli, &cfg, &smc);
    let closed = smc.into_channel().close();
    finish(result, closed)
}
