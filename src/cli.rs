//! 命令行前端
//!
//! 每个子命令都是一次"打开视图 -> 驱动控制器 -> 打印结果"：
//! 先经过与界面相同的守卫导航，再调用对应页面控制器。

use std::rc::Rc;

use campusvoice_shared::{Complaint, ComplaintStatus, StatusFilter, User};
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::app::App;
use crate::config::{ClientConfig, ConfigError, SessionMode};
use crate::web::http::{ReqwestHttpClient, TransportError};
use crate::web::route::{AppRoute, Location};
use crate::web::storage::FileStore;

#[derive(Parser)]
#[command(name = "campusvoice")]
#[command(about = "Submit and review campus complaints")]
pub struct Cli {
    /// API base URL (overrides CAMPUSVOICE_API_BASE_URL)
    #[arg(long, global = true)]
    pub api: Option<String>,
    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Update name and username
    Profile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
    },
    /// List my complaints
    Complaints {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Submit a new complaint
    Submit { description: String },
    /// Delete one of my complaints
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Approved complaints from other students
    Community,
    /// Like a community complaint
    Like { id: String },
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List all complaints
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Approve or reject a complaint
    Review {
        id: String,
        #[arg(value_enum)]
        status: StatusArg,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Add a comment without changing the status
    Comment { id: String, text: String },
    Delete {
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for ComplaintStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => ComplaintStatus::Pending,
            StatusArg::Approved => ComplaintStatus::Approved,
            StatusArg::Rejected => ComplaintStatus::Rejected,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot open {wanted}: redirected to {landed}")]
    Redirected { wanted: AppRoute, landed: Location },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn failed(message: Option<String>, fallback: &str) -> CliError {
    CliError::Failed(message.unwrap_or_else(|| fallback.to_string()))
}

/// 组装生产环境的 `App`
pub fn build_app(config: ClientConfig, initial: Location) -> Result<App, CliError> {
    let http = ReqwestHttpClient::new(
        config.session_mode == SessionMode::Cookie,
        config.http_timeout,
    )?;
    let storage = FileStore::new(&config.state_dir);
    Ok(App::new(config, Rc::new(http), Rc::new(storage), initial))
}

/// 以守卫导航进入视图；被重定向时报错
async fn enter(app: &App, location: Location) -> Result<(), CliError> {
    let wanted = location.route;
    let landed = app.navigate_to(location).await;
    if landed.route != wanted {
        return Err(CliError::Redirected { wanted, landed });
    }
    Ok(())
}

fn filtered(route: AppRoute, status: Option<StatusArg>) -> Location {
    let filter = status
        .map(|s| StatusFilter::Only(s.into()))
        .unwrap_or_default();
    Location::new(route).with_status_filter(filter)
}

pub async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let config = match &cli.api {
        Some(url) => config.with_api_base_url(url)?,
        None => config,
    };
    let app = build_app(config, Location::new(AppRoute::Complaints))?;
    app.start().await;

    let json = cli.json;
    match cli.command {
        Commands::Login { email, password } => {
            enter(&app, Location::new(AppRoute::Login)).await?;
            let page = app.login_page();
            page.set_email(&email);
            page.set_password(&password);
            let user = page
                .submit()
                .await
                .ok_or_else(|| failed(page.error(), "login failed"))?;
            print_user(&user, json)?;
        }
        Commands::Register {
            email,
            password,
            name,
            username,
        } => {
            enter(&app, Location::new(AppRoute::Register)).await?;
            let page = app.register_page();
            page.set_email(&email);
            page.set_password(&password);
            page.set_name(name.as_deref().unwrap_or_default());
            page.set_username(username.as_deref().unwrap_or_default());
            let user = page
                .submit()
                .await
                .ok_or_else(|| failed(page.error(), "registration failed"))?;
            print_user(&user, json)?;
        }
        Commands::Logout => {
            app.logout().await;
            println!("Signed out.");
        }
        Commands::Whoami => match app.session.current_user() {
            Some(user) => print_user(&user, json)?,
            None => return Err(CliError::Failed("not signed in".to_string())),
        },
        Commands::Profile { name, username } => {
            enter(&app, Location::new(AppRoute::Profile)).await?;
            let page = app.profile_page();
            page.set_name(&name);
            page.set_username(&username);
            let user = page
                .save()
                .await
                .ok_or_else(|| failed(page.error(), "profile update failed"))?;
            print_user(&user, json)?;
        }
        Commands::Complaints { status } => {
            enter(&app, filtered(AppRoute::Complaints, status)).await?;
            let page = app.complaints_page();
            page.load().await;
            if let Some(error) = page.load_error() {
                return Err(CliError::Failed(error));
            }
            print_complaints(&page.visible(), json)?;
        }
        Commands::Submit { description } => {
            enter(&app, Location::new(AppRoute::Complaints)).await?;
            let page = app.complaints_page();
            page.set_draft(&description);
            let complaint = page
                .submit()
                .await
                .ok_or_else(|| failed(page.submit_error(), "submission failed"))?;
            print_complaints(&[complaint], json)?;
        }
        Commands::Delete { id, yes } => {
            enter(&app, Location::new(AppRoute::Complaints)).await?;
            let page = app.complaints_page();
            page.load().await;
            if !page.request_delete(&id) {
                return Err(CliError::Failed(format!("complaint {} cannot be deleted", id)));
            }
            if !yes {
                page.cancel_delete();
                println!("Re-run with --yes to delete complaint {}.", id);
                return Ok(());
            }
            if !page.confirm_delete().await {
                return Err(failed(page.action_error(), "delete failed"));
            }
            println!("Deleted complaint {}.", id);
        }
        Commands::Community => {
            enter(&app, Location::new(AppRoute::Community)).await?;
            let page = app.community_page();
            page.load().await;
            if let Some(error) = page.load_error() {
                return Err(CliError::Failed(error));
            }
            print_complaints(&page.visible(), json)?;
        }
        Commands::Like { id } => {
            enter(&app, Location::new(AppRoute::Community)).await?;
            let page = app.community_page();
            page.load().await;
            if !page.toggle_like(&id).await {
                return Err(failed(page.action_error(), "cannot like this complaint"));
            }
            if let Some(complaint) = page.find(&id) {
                print_complaints(&[complaint], json)?;
            }
        }
        Commands::Admin { command } => run_admin(&app, command, json).await?,
    }

    Ok(())
}

async fn run_admin(app: &App, command: AdminCommand, json: bool) -> Result<(), CliError> {
    let location = match &command {
        AdminCommand::List { status } => filtered(AppRoute::AdminComplaints, *status),
        _ => Location::new(AppRoute::AdminComplaints),
    };
    enter(app, location).await?;

    let page = app.admin_complaints_page();
    page.load().await;
    if let Some(error) = page.load_error() {
        return Err(CliError::Failed(error));
    }

    match command {
        AdminCommand::List { .. } => print_complaints(&page.visible(), json)?,
        AdminCommand::Review {
            id,
            status,
            comment,
        } => {
            if !page.update_status(&id, status.into(), comment.as_deref()).await {
                return Err(failed(page.action_error(), "update failed"));
            }
            if let Some(complaint) = page.find(&id) {
                print_complaints(&[complaint], json)?;
            }
        }
        AdminCommand::Comment { id, text } => {
            page.set_comment_draft(&id, &text);
            if !page.submit_comment(&id).await {
                return Err(failed(page.action_error(), "comment was empty or failed"));
            }
            if let Some(complaint) = page.find(&id) {
                print_complaints(&[complaint], json)?;
            }
        }
        AdminCommand::Delete { id, yes } => {
            if !page.request_delete(&id) {
                return Err(CliError::Failed(format!("complaint {} not found", id)));
            }
            if !yes {
                page.cancel_delete();
                println!("Re-run with --yes to delete complaint {}.", id);
                return Ok(());
            }
            if !page.confirm_delete().await {
                return Err(failed(page.action_error(), "delete failed"));
            }
            println!("Deleted complaint {}.", id);
        }
    }
    Ok(())
}

// =========================================================
// 输出
// =========================================================

fn print_user(user: &User, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
    } else {
        println!("{} <{}> ({})", user.display_name(), user.email, user.role.as_str());
    }
    Ok(())
}

fn print_complaints(complaints: &[Complaint], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(complaints)?);
        return Ok(());
    }
    if complaints.is_empty() {
        println!("No complaints.");
        return Ok(());
    }
    for c in complaints {
        println!(
            "{}  [{}]  {}  {}  {}",
            c.id,
            c.status.label(),
            c.created_at.format("%Y-%m-%d"),
            c.likes_label(),
            c.description
        );
        for comment in c.comments() {
            println!(
                "    - {} ({}): {}",
                comment.admin_id,
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.content
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_review() {
        let cli = Cli::try_parse_from([
            "campusvoice",
            "admin",
            "review",
            "c1",
            "approved",
            "--comment",
            "Verified",
        ])
        .unwrap();
        match cli.command {
            Commands::Admin {
                command:
                    AdminCommand::Review {
                        id,
                        status,
                        comment,
                    },
            } => {
                assert_eq!(id, "c1");
                assert_eq!(ComplaintStatus::from(status), ComplaintStatus::Approved);
                assert_eq!(comment.as_deref(), Some("Verified"));
            }
            _ => panic!("expected admin review"),
        }
    }

    #[test]
    fn test_filtered_location() {
        assert_eq!(
            filtered(AppRoute::Complaints, Some(StatusArg::Rejected)).to_url(),
            "/complaints?status=rejected"
        );
        assert_eq!(filtered(AppRoute::AdminComplaints, None).to_url(), "/admin/complaints");
    }
}
