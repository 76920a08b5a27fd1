#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use shift_resolver::{
    io,
    resolver::build_model,
    storage::{JsonStorage, Storage},
    template::{generate_shifts_within, load_template_from_file},
    ResolveError, ResolveRequest, Resolver, ResolverOptions, TimeWindow,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Résolution d'affectations de gardes (flot max à coût min)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Résoudre une requête JSON (`-` pour stdin)
    Resolve {
        #[arg(long)]
        request: String,
        /// Réponse JSON ; stdout si absent
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        assignments_csv: Option<String>,
        #[arg(long)]
        gaps_csv: Option<String>,
        /// Budget de temps en millisecondes
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Options du résolveur (JSON)
        #[arg(long)]
        config: Option<String>,
        /// Écrire aussi un résultat TIMED_OUT dans les fichiers de sortie
        #[arg(long)]
        keep_timed_out: bool,
    },

    /// Assembler une requête à partir de CSV ou d'un gabarit
    BuildRequest {
        #[arg(long)]
        staff: String,
        #[arg(long, conflicts_with = "template", required_unless_present = "template")]
        shifts: Option<String>,
        #[arg(long)]
        template: Option<String>,
        /// RFC3339 UTC ou YYYY-MM-DD
        #[arg(long)]
        period_start: String,
        /// RFC3339 UTC ou YYYY-MM-DD (journée incluse)
        #[arg(long)]
        period_end: String,
        #[arg(long)]
        max_per_group: Option<u32>,
        #[arg(long)]
        out: String,
    },

    /// Valider une requête et compter les paires éligibles, sans résoudre
    Check {
        #[arg(long)]
        request: String,
    },

    /// Résoudre plusieurs requêtes en parallèle
    Batch {
        #[arg(long, num_args = 1.., required = true)]
        request: Vec<String>,
        #[arg(long)]
        out_dir: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        keep_timed_out: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    let code = match run(cli.cmd) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            err.downcast_ref::<ResolveError>()
                .map(ResolveError::exit_code)
                .unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn run(cmd: Commands) -> Result<i32> {
    match cmd {
        Commands::Resolve {
            request,
            out,
            assignments_csv,
            gaps_csv,
            timeout_ms,
            config,
            keep_timed_out,
        } => {
            let resolver = Resolver::new(load_options(config.as_deref(), timeout_ms)?);
            let req = io::read_request(&request)?;
            let response = resolver.resolve(&req)?;

            if !response.status.is_authoritative() && !keep_timed_out {
                eprintln!(
                    "warning: {} result is not authoritative, output files not written \
                     (use --keep-timed-out to write them)",
                    response.status
                );
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(response.status.exit_code());
            }
            match out {
                Some(path) => {
                    io::write_response(&path, &response)?;
                    println!("{response}");
                }
                None => println!("{}", serde_json::to_string_pretty(&response)?),
            }
            if let Some(path) = assignments_csv {
                io::export_assignments_csv(path, &req, &response)?;
            }
            if let Some(path) = gaps_csv {
                io::export_gaps_csv(path, &response)?;
            }
            Ok(response.status.exit_code())
        }
        Commands::BuildRequest {
            staff,
            shifts,
            template,
            period_start,
            period_end,
            max_per_group,
            out,
        } => {
            let (start, _) = io::parse_point(&period_start)?;
            let (mut end, end_was_date) = io::parse_point(&period_end)?;
            if end_was_date {
                end += Duration::days(1);
            }
            let period = TimeWindow::new(start, end).map_err(anyhow::Error::msg)?;

            let members = io::import_staff_csv(&staff)?;
            let shifts = match (shifts, template) {
                (Some(path), _) => io::import_shifts_csv(path)?,
                (None, Some(path)) => {
                    let tpl = load_template_from_file(path)?;
                    let (shifts, skipped) = generate_shifts_within(&tpl, &period)?;
                    if skipped > 0 {
                        eprintln!("note: {skipped} template shifts outside the period skipped");
                    }
                    shifts
                }
                (None, None) => bail!("either --shifts or --template is required"),
            };
            let roles = io::roles_of(&members);
            let req = io::build_request(members, shifts, period, max_per_group);
            JsonStorage::open(&out)?.save(&req)?;
            println!(
                "Request written to {} ({} staff, {} shifts, roles: {})",
                out,
                req.staff.len(),
                req.shifts.len(),
                roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(",")
            );
            Ok(0)
        }
        Commands::Check { request } => {
            let req = io::read_request(&request)?;
            let model = build_model(&req, &ResolverOptions::default())?;
            println!(
                "OK: {} staff, {} shifts, {} headcount, {} eligible pairs",
                model.staff().len(),
                model.shifts().len(),
                req.required_headcount(),
                model.eligible_pairs()
            );
            for (reason, count) in model.rejections() {
                println!("  rejected ({reason}): {count}");
            }
            Ok(0)
        }
        Commands::Batch {
            request,
            out_dir,
            timeout_ms,
            config,
            keep_timed_out,
        } => {
            let resolver = Resolver::new(load_options(config.as_deref(), timeout_ms)?);
            let requests = request
                .iter()
                .map(io::read_request)
                .collect::<Result<Vec<ResolveRequest>>>()?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {out_dir}"))?;

            let mut code = 0;
            let mut stems = HashSet::new();
            let results = resolver.resolve_batch(&requests);
            for (idx, (path, result)) in request.iter().zip(results).enumerate() {
                let target = response_path(Path::new(&out_dir), path, idx + 1, &mut stems);
                match result {
                    Ok(response) => {
                        if response.status.is_authoritative() || keep_timed_out {
                            io::write_response(&target, &response)?;
                        } else {
                            eprintln!(
                                "warning: {path}: {} result is not authoritative, {} not written",
                                response.status,
                                target.display()
                            );
                        }
                        println!("{path}: {response}");
                        code = code.max(response.status.exit_code());
                    }
                    Err(err) => {
                        eprintln!("{path}: {err}");
                        code = code.max(err.exit_code());
                    }
                }
            }
            Ok(code)
        }
    }
}

/// Options depuis `--config`, puis `--timeout-ms` par-dessus.
fn load_options(config: Option<&str>, timeout_ms: Option<u64>) -> Result<ResolverOptions> {
    let mut options: ResolverOptions = match config {
        Some(path) => JsonStorage::open(path)?.load()?,
        None => ResolverOptions::default(),
    };
    if timeout_ms.is_some() {
        options.time_budget_ms = timeout_ms;
    }
    Ok(options)
}

/// `<stem>.response.json`, ou `<stem>.<position>.response.json` quand le
/// nom est déjà pris dans ce lot.
fn response_path(out_dir: &Path, request: &str, position: usize, taken: &mut HashSet<String>) -> PathBuf {
    let stem = Path::new(request)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("request");
    let mut name = format!("{stem}.response.json");
    if !taken.insert(name.clone()) {
        name = format!("{stem}.{position}.response.json");
        taken.insert(name.clone());
    }
    out_dir.join(name)
}
