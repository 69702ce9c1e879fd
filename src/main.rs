use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use clinic_session::config::{config_schema, load_config};
use clinic_session::models::notification::unread_count;
use clinic_session::session::{GuardView, ProtectedQuery, QueryKey};
use clinic_session::startup::{build_session, ClinicSession};
use clinic_session::utils::logger::init_logging;

const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Parser, Debug)]
#[command(name = "clinic-session", about = "Clinic dashboard session client", version)]
struct Cli {
    /// Path to the YAML configuration
    #[arg(long, default_value = "./config.yaml")]
    config: String,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    schema: bool,

    /// Used to sign in when no stored session is usable
    #[arg(long, env = "CLINIC_LOGIN_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "CLINIC_LOGIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

async fn login_with(session: &ClinicSession, cli: &Cli) -> bool {
    let (Some(email), Some(password)) = (cli.email.as_deref(), cli.password.as_deref()) else {
        warn!("No stored session and no CLINIC_LOGIN_EMAIL/CLINIC_LOGIN_PASSWORD set");
        return false;
    };

    match session.context.login(email, password).await {
        Ok(user) => {
            info!(
                event_name = "session.login",
                event_domain = "session",
                role = user.role.as_str(),
                "signed in as {}",
                user.email
            );
            true
        }
        Err(e) => {
            error!("Sign-in failed: {}", e);
            false
        }
    }
}

async fn load_dashboard(session: &ClinicSession) {
    let analytics = session.analytics();
    let notifications = session.notifications();

    let dashboard = ProtectedQuery::new(
        QueryKey::new(["clinicAnalytics", "dashboard"]),
        session.context.clone(),
        |auth| {
            let analytics = analytics.clone();
            async move { analytics.dashboard(None, &auth).await }
        },
    );
    let clinical = ProtectedQuery::new(
        QueryKey::new(["clinicAnalytics", "clinical"]),
        session.context.clone(),
        |auth| {
            let analytics = analytics.clone();
            async move { analytics.clinical(None, None, &auth).await }
        },
    );
    let inbox = ProtectedQuery::new(
        QueryKey::new(["notifications"]),
        session.context.clone(),
        |auth| {
            let notifications = notifications.clone();
            async move { notifications.list(&auth).await }
        },
    );

    let (dashboard, clinical, inbox) =
        futures::join!(dashboard.fetch(), clinical.fetch(), inbox.fetch());

    match dashboard {
        Ok(Some(metrics)) => info!(
            today_appointments = metrics.today_appointments,
            total_patients = metrics.total_patients,
            "dashboard metrics loaded"
        ),
        Ok(None) => warn!("Dashboard query was not enabled"),
        Err(e) => warn!("Dashboard metrics unavailable: {}", e),
    }
    match clinical {
        Ok(Some(clinical)) => {
            let trend = clinical.appointment_series();
            info!(
                points = trend.len(),
                scheduled = trend.iter().map(|p| p.scheduled).sum::<u32>(),
                completed = trend.iter().map(|p| p.completed).sum::<u32>(),
                "appointment trend loaded"
            );
            for share in clinical.condition_shares() {
                info!(
                    condition = share.name.as_str(),
                    count = share.value,
                    percentage = share.percentage,
                    "top condition"
                );
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Clinical analytics unavailable: {}", e),
    }
    match inbox {
        Ok(Some(items)) => info!(
            total = items.len(),
            unread = unread_count(&items),
            "notifications loaded"
        ),
        Ok(None) => {}
        Err(e) => warn!("Notifications unavailable: {}", e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.schema {
        println!("{}", config_schema());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli.config) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let session = match build_session(config.clone()).await {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let route_guard = session.route_guard();
    let mut view = route_guard.resolve(DASHBOARD_PATH).await;
    if view
        == (GuardView::Navigate {
            to: config.session.login_path.clone(),
        })
        && login_with(&session, &cli).await
    {
        view = route_guard.resolve(DASHBOARD_PATH).await;
    }

    match view {
        GuardView::Children {
            show_tenant_switcher,
        } => {
            info!(
                show_tenant_switcher,
                active_tenant = session.context.snapshot().active_tenant_id.as_deref(),
                "dashboard unlocked"
            );
            load_dashboard(&session).await;
            ExitCode::SUCCESS
        }
        GuardView::Navigate { to } => {
            warn!("Dashboard is not available, redirect to {}", to);
            ExitCode::FAILURE
        }
        GuardView::Spinner => {
            warn!("Route guard did not settle");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_and_flags() {
        let cli = Cli::try_parse_from(["clinic-session"]).unwrap();
        assert_eq!(cli.config, "./config.yaml");
        assert!(!cli.schema);

        let cli = Cli::try_parse_from([
            "clinic-session",
            "--config",
            "/etc/clinic.yaml",
            "--schema",
            "--email",
            "dr@clinic.test",
            "--password",
            "secret",
        ])
        .unwrap();
        assert_eq!(cli.config, "/etc/clinic.yaml");
        assert!(cli.schema);
        assert_eq!(cli.email.as_deref(), Some("dr@clinic.test"));
        assert_eq!(cli.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_cli_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["clinic-session", "--bogus"]).is_err());
    }
}
