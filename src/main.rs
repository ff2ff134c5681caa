#[cfg(feature = "native")]
const USAGE: &str = "\
usage: gigboard <command>

commands:
  login <email> <password>
  register <name> <email> <password> <CLIENT|FREELANCER|ADMIN>
  whoami
  logout
  route <path>
  jobs
  job <id>
  skills
  change-password <old> <new>";

#[cfg(feature = "native")]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    use std::process::ExitCode;
    use std::sync::Arc;

    use gigboard::core::auth::{AuthApi, FileTokenStore, HttpClient, SessionManager};
    use gigboard::core::config::Config;

    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    tracing::info!(
        "Config loaded: api_host={}, token_file={}",
        config.has_api_host(),
        config.has_token_file()
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    let (base_url, token_path) = match (config.api_base_url(), config.token_file_path()) {
        (Ok(url), Ok(path)) => (url, path),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tokens = match FileTokenStore::open(&token_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Failed to open {}: {}", token_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let client = HttpClient::new(base_url, tokens);
    let session = SessionManager::start(AuthApi::new(client)).await;

    match cli::run(&session, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(cli::CliError::Usage) => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
        Err(cli::CliError::Api(e)) => {
            eprintln!("{}", gigboard::Notification::from_error(&e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "native")]
mod cli {
    use gigboard::core::auth::{ApiError, Navigation, RoleTag, SessionManager};
    use gigboard::core::jobs::JobsApi;
    use gigboard::core::notifications::Notification;

    pub enum CliError {
        Usage,
        Api(ApiError),
    }

    impl From<ApiError> for CliError {
        fn from(e: ApiError) -> Self {
            CliError::Api(e)
        }
    }

    pub async fn run(session: &SessionManager, args: &[String]) -> Result<(), CliError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let jobs = JobsApi::new(session.client().clone());

        match args.as_slice() {
            ["login", email, password] => {
                let user = session.login(email, password).await?;
                println!("{}", Notification::login_success());
                println!("Signed in as {} <{}>", user.username, user.email);
            }
            ["register", name, email, password, role] => {
                let role: RoleTag = role.parse().map_err(|_| CliError::Usage)?;
                let user = session.register(name, email, password, role).await?;
                println!("{}", Notification::registration_success());
                println!("Signed in as {} <{}>", user.username, user.email);
            }
            ["whoami"] => match session.user() {
                Some(user) => {
                    let roles: Vec<&str> = user.roles.iter().map(RoleTag::as_str).collect();
                    println!("{} <{}> [{}]", user.username, user.email, roles.join(", "));
                }
                None => println!("Not signed in"),
            },
            ["logout"] => {
                session.logout();
                println!("{}", Notification::logged_out());
            }
            ["route", path] => match session.navigate(path) {
                Navigation::Pending => println!("pending"),
                Navigation::Public(route) => println!("render {} (public)", route),
                Navigation::Render { route, user } => {
                    println!("render {} for {}", route, user.username)
                }
                Navigation::Redirect { target, from } => match from {
                    Some(from) => println!("redirect {} (from {})", target, from),
                    None => println!("redirect {}", target),
                },
                Navigation::NoAccess { user } => {
                    println!("no page available for {}", user.username)
                }
            },
            ["jobs"] => {
                for job in jobs.list_jobs().await? {
                    let salary = job.salary.as_deref().unwrap_or("-");
                    println!("#{:<5} {}  {}", job.id, job.title, salary);
                }
            }
            ["job", id] => {
                let id: u64 = id.parse().map_err(|_| CliError::Usage)?;
                let job = jobs.job_detail(id).await?;
                println!("#{} {}", job.id, job.title);
                if let Some(client) = &job.client_name {
                    println!("client: {}", client);
                }
                if let (Some(min), Some(max)) = (job.budget_min, job.budget_max) {
                    println!("budget: {} - {}", min, max);
                }
                if !job.skills.is_empty() {
                    println!("skills: {}", job.skills.join(", "));
                }
                println!("applications: {}", job.job_applications.len());
            }
            ["skills"] => {
                for skill in jobs.list_skills().await? {
                    println!("{}\t{}", skill.public_id, skill.name);
                }
            }
            ["change-password", old, new] => {
                session.change_password(old, new).await?;
                println!("{}", Notification::password_changed());
            }
            _ => return Err(CliError::Usage),
        }

        Ok(())
    }
}

#[cfg(not(feature = "native"))]
pub fn main() {
    // the binary needs the native feature; see lib.rs for the library surface
}
