use dukaan_core::config::{AppConfig, CacheBackend, LoadOptions};
use dukaan_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub struct DoctorOutput {
    pub passed: bool,
    pub output: String,
}

pub fn run(options: &LoadOptions, json_output: bool) -> DoctorOutput {
    let report = build_report(options);
    let passed = report.overall_status == CheckStatus::Pass;

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    DoctorOutput { passed, output }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_cache_backend(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("cache_backend"));
            checks.push(skipped("database_connectivity"));
            checks.push(skipped("schema_migrations"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_cache_backend(config: &AppConfig) -> DoctorCheck {
    let details = match config.cache.backend {
        CacheBackend::Memory => {
            format!("in-process cache bounded at {} entries", config.cache.capacity)
        }
        CacheBackend::Sqlite => "shared cache in the `response_cache` table".to_string(),
    };
    DoctorCheck { name: "cache_backend", status: CheckStatus::Pass, details }
}

/// Connectivity, then whether every known migration has been applied.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck {
                    name: "schema_migrations",
                    status: CheckStatus::Skipped,
                    details: "skipped because the runtime did not start".to_string(),
                },
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck {
                        name: "schema_migrations",
                        status: CheckStatus::Skipped,
                        details: "skipped because the database is unreachable".to_string(),
                    },
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };
        let migrations = check_migrations(&pool).await;
        pool.close().await;
        vec![connectivity, migrations]
    })
}

async fn check_migrations(pool: &DbPool) -> DoctorCheck {
    match migrations::status(pool).await {
        Ok(status) if status.is_current() => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Pass,
            details: format!("{} of {} migrations applied", status.applied, status.known),
        },
        Ok(status) => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Fail,
            details: format!(
                "{} of {} migrations applied; run `dukaan migrate`",
                status.applied, status.known
            ),
        },
        Err(error) => DoctorCheck {
            name: "schema_migrations",
            status: CheckStatus::Fail,
            details: format!("failed to read migration history: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
