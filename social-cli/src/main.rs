use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use social_client::models::{
    FriendshipStatus, ImageUpload, Post, PostDraft, PostUpdate, SignupRequest,
};
use social_client::{Confirm, Notices, Outcome, SessionState, SocialClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API base URL. Falls back to SOCIAL_API_URL, then localhost.
    #[arg(short, long)]
    server: Option<String>,

    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Answer yes to every confirmation prompt.
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    Logout,

    /// Show who the saved session belongs to
    Whoami,

    /// Show the post feed
    Feed,

    /// Publish a post
    Post {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,

        /// Attach an image file
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Edit a post you own
    Edit {
        #[arg(long)]
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,
    },

    /// Delete a post you own
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Toggle your like on a post
    Like {
        #[arg(long)]
        id: i64,
    },

    /// Comment on a post
    Comment {
        #[arg(short, long)]
        post: i64,

        #[arg(short, long)]
        text: String,
    },

    /// Delete a comment you own
    DeleteComment {
        #[arg(short, long)]
        post: i64,

        #[arg(long)]
        id: i64,
    },

    /// Toggle your like on a comment
    LikeComment {
        #[arg(short, long)]
        post: i64,

        #[arg(long)]
        id: i64,
    },

    /// List friends and incoming requests
    Friends,

    /// Search the user directory
    Find {
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Send a friend request
    Add {
        #[arg(long)]
        id: i64,
    },

    /// Accept an incoming friend request
    Accept {
        #[arg(long)]
        id: i64,
    },

    /// End a friendship
    Unfriend {
        #[arg(long)]
        id: i64,
    },

    /// Show the conversation with a friend
    Messages {
        #[arg(short, long)]
        friend: i64,
    },

    /// Send a direct message
    Send {
        #[arg(short, long)]
        friend: i64,

        #[arg(short, long)]
        text: String,
    },

    /// Show a profile (your own without --id)
    Profile {
        #[arg(long)]
        id: Option<i64>,
    },

    /// Set or remove your profile picture
    Avatar {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        remove: bool,
    },

    /// Delete your account
    DeleteAccount,
}

/// Session cookie persisted between runs, tied to the server it came from.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    server: String,
    cookie: String,
}

struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    fn new(custom_path: Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path,
            None => {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                home.join(".social_session")
            }
        };

        Ok(Self { path })
    }

    fn save(&self, server: &str, cookie: &str) -> Result<()> {
        let stored = StoredSession {
            server: server.to_string(),
            cookie: cookie.to_string(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("Failed to save session to {:?}", self.path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Loads the cookie if one is stored for this server.
    fn load(&self, server: &str) -> Result<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session file"),
        };
        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(_) => return Ok(None),
        };
        if stored.server != server {
            println!(
                "ℹ️ Saved session is for {}, not {}; ignoring it",
                stored.server, server
            );
            return Ok(None);
        }
        Ok(Some(stored.cookie))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file {:?}", self.path))?;
        }
        Ok(())
    }
}

/// Interactive y/N prompt for destructive actions.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let server = cli
        .server
        .or_else(|| std::env::var("SOCIAL_API_URL").ok())
        .unwrap_or_else(|| "http://localhost:5000".to_string());
    tracing::debug!(%server, "using API server");

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(social_client::AlwaysConfirm)
    } else {
        Arc::new(StdinConfirm)
    };
    let client =
        SocialClient::with_confirm(&server, confirm).context("Failed to create client")?;

    let store = SessionStore::new(cli.session_file)?;
    if let Some(cookie) = store.load(&server)? {
        client.restore_session(&cookie);
    }

    match cli.command {
        Commands::Signup {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            println!("📝 Creating account: {}", username);

            let request = SignupRequest {
                username,
                email: email.clone(),
                password,
                first_name,
                last_name,
            };
            match client.session().signup(request).await {
                Ok(()) => {
                    println!("{}", "✅ Account created!".green());
                    println!("   Log in with: social-cli login --email {} --password <password>", email);
                }
                Err(e) => {
                    println!("{}", format!("❌ Signup failed: {}", e).red());
                    std::process::exit(1);
                }
            }
        }

        Commands::Login { email, password } => {
            println!("🔑 Logging in as: {}", email);

            match client.session().login(email, password).await {
                Ok(user) => {
                    println!("{}", format!("✅ Logged in as {}", user.display_name()).green());
                    match client.session_cookie() {
                        Some(cookie) => store.save(&server, &cookie)?,
                        None => println!("⚠️ Server sent no session cookie; login will not persist"),
                    }
                }
                Err(e) => {
                    println!("{}", format!("❌ Login failed: {}", e).red());
                    std::process::exit(1);
                }
            }
        }

        Commands::Logout => match client.session().logout().await {
            Ok(()) => {
                store.clear()?;
                println!("{}", "✅ Logged out".green());
            }
            Err(e) => {
                println!("{}", format!("❌ Logout failed: {}", e).red());
                std::process::exit(1);
            }
        },

        Commands::Whoami => match client.session().check().await {
            SessionState::Authenticated(user) => {
                println!("{}", format!("✅ Logged in as {}", user.display_name()).green());
                if let Some(email) = user.email {
                    println!("   Email: {}", email);
                }
            }
            _ => {
                println!("{}", "❌ Not logged in".red());
                println!("   Please login first: social-cli login --email <email> --password <password>");
                std::process::exit(1);
            }
        },

        Commands::Feed => {
            let feed = client.feed();
            ensure(feed.refresh().await, feed.notices(), "Loading the feed");

            let posts = feed.posts().await;
            println!("📋 {} posts", posts.len());
            println!();
            if posts.is_empty() {
                println!("   No posts yet");
                println!("   Tip: social-cli post --title \"My first post\" --content \"Hello\"");
            } else {
                for post in &posts {
                    print_post(post);
                }
            }
        }

        Commands::Post {
            title,
            content,
            image,
        } => {
            println!("📝 Publishing post...");

            let mut draft = PostDraft::new(title, content);
            if let Some(path) = image {
                let bytes =
                    fs::read(&path).with_context(|| format!("Failed to read image {:?}", path))?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("image")
                    .to_string();
                draft = draft.with_image(ImageUpload { file_name, bytes });
            }

            let feed = client.feed();
            ensure(feed.create_post(draft).await, feed.notices(), "Publishing");
            println!("{}", "✅ Post published!".green());
        }

        Commands::Edit { id, title, content } => {
            println!("✏️ Updating post #{}", id);

            let feed = client.feed();
            let update = PostUpdate { title, content };
            ensure(feed.update_post(id, update).await, feed.notices(), "Updating");
            println!("{}", "✅ Post updated!".green());
        }

        Commands::Delete { id } => {
            let feed = client.feed();
            ensure(feed.delete_post(id).await, feed.notices(), "Deleting");
            println!("{}", "✅ Post deleted".green());
        }

        Commands::Like { id } => {
            let feed = client.feed();
            ensure(feed.refresh().await, feed.notices(), "Loading the feed");
            ensure(feed.toggle_post_like(id).await, feed.notices(), "Updating like");

            match feed.posts().await.iter().find(|p| p.id == id) {
                Some(post) if post.liked_by_user => {
                    println!("{}", format!("👍 Liked ({} total)", post.likes).green())
                }
                Some(post) => println!("👍 Like removed ({} total)", post.likes),
                None => {
                    println!("{}", format!("❌ No post #{} in the feed", id).red());
                    std::process::exit(1);
                }
            }
        }

        Commands::Comment { post, text } => {
            let feed = client.feed();
            ensure(feed.add_comment(post, &text).await, feed.notices(), "Commenting");
            println!("{}", "✅ Comment posted".green());
        }

        Commands::DeleteComment { post, id } => {
            let feed = client.feed();
            ensure(
                feed.delete_comment(post, id).await,
                feed.notices(),
                "Deleting comment",
            );
            println!("{}", "✅ Comment deleted".green());
        }

        Commands::LikeComment { post, id } => {
            let feed = client.feed();
            ensure(feed.refresh().await, feed.notices(), "Loading the feed");
            ensure(
                feed.toggle_comment_like(post, id).await,
                feed.notices(),
                "Updating like",
            );
            println!("{}", "👍 Comment like toggled".green());
        }

        Commands::Friends => {
            let view = client.friends();
            ensure(view.refresh().await, view.notices(), "Loading friends");

            let friends = view.friends().await;
            println!("🤝 {} friends", friends.len());
            for friendship in &friends {
                println!("   [{}] {}", friendship.friend.id, friendship.friend.display_name());
            }

            let incoming = view.incoming_requests().await;
            if !incoming.is_empty() {
                println!();
                println!("📨 {} incoming requests", incoming.len());
                for request in &incoming {
                    println!("   [{}] from {}", request.id, request.user.display_name());
                }
                println!("   Accept with: social-cli accept --id <request id>");
            }
        }

        Commands::Find { query } => {
            let view = client.friends();
            ensure(
                view.refresh_directory().await,
                view.notices(),
                "Loading the user directory",
            );

            let users = view.find_users(&query).await;
            println!("🔍 {} users found", users.len());
            for user in &users {
                println!("   [{}] {}", user.id, user.display_name());
            }
            if !users.is_empty() {
                println!("   Send a request with: social-cli add --id <user id>");
            }
        }

        Commands::Add { id } => {
            let view = client.friends();
            ensure(view.send_request(id).await, view.notices(), "Sending request");
            print_success_banner(view.notices());
        }

        Commands::Accept { id } => {
            let view = client.friends();
            ensure(view.refresh().await, view.notices(), "Loading friends");
            ensure(view.accept_request(id).await, view.notices(), "Accepting");
            print_success_banner(view.notices());
        }

        Commands::Unfriend { id } => {
            let view = client.profile(None);
            ensure(view.unfriend(id).await, view.notices(), "Unfriending");
            println!("{}", "✅ Unfriended".green());
        }

        Commands::Messages { friend } => {
            let view = client.conversation();
            ensure(view.refresh_friends().await, view.notices(), "Loading friends");

            let partner = view
                .friends()
                .await
                .into_iter()
                .find(|f| f.friend.id == friend);
            let Some(partner) = partner else {
                println!("{}", format!("❌ No friend with id {}", friend).red());
                println!("   See your friends with: social-cli friends");
                std::process::exit(1);
            };

            view.select_partner(Some(friend)).await;
            ensure(view.refresh_messages().await, view.notices(), "Loading messages");

            let me = client.session().current_user().await.map(|u| u.id);
            let messages = view.messages().await;
            println!("💬 {} with {}", plural(messages.len(), "message"), partner.friend.display_name());
            for message in &messages {
                let arrow = if Some(message.sender_id) == me { "→" } else { "←" };
                println!(
                    "   {} [{}] {}",
                    arrow,
                    local_time(message.created_at),
                    message.content
                );
            }
        }

        Commands::Send { friend, text } => {
            let view = client.conversation();
            view.select_partner(Some(friend)).await;
            ensure(view.send(&text).await, view.notices(), "Sending");
            println!("{}", "✅ Message sent".green());
        }

        Commands::Profile { id } => {
            let view = client.profile(id);
            ensure(view.refresh().await, view.notices(), "Loading the profile");

            let Some(user) = view.profile_user().await else {
                println!("{}", "❌ Profile did not load".red());
                std::process::exit(1);
            };
            println!("👤 {}", user.display_name());
            if let Some(email) = &user.email {
                println!("   Email: {}", email);
            }
            if let Some(url) = &user.profile_picture {
                println!("   Picture: {}", url);
            }
            if let Some(status) = view.friendship_status().await {
                println!("   {}", describe_status(status));
            }

            let posts = view.posts().await;
            println!();
            println!("📋 {}", plural(posts.len(), "post"));
            for post in &posts {
                print_post(post);
            }
        }

        Commands::Avatar { file, remove } => {
            let view = client.profile(None);
            match (file, remove) {
                (Some(path), false) => {
                    let bytes = fs::read(&path)
                        .with_context(|| format!("Failed to read image {:?}", path))?;
                    let file_name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("avatar")
                        .to_string();
                    ensure(
                        view.upload_avatar(ImageUpload { file_name, bytes }).await,
                        view.notices(),
                        "Uploading",
                    );
                    println!("{}", "✅ Profile picture updated".green());
                }
                (None, true) => {
                    ensure(view.remove_avatar().await, view.notices(), "Removing");
                    println!("{}", "✅ Profile picture removed".green());
                }
                _ => bail!("Use exactly one of --file <path> or --remove"),
            }
        }

        Commands::DeleteAccount => {
            let view = client.profile(None);
            ensure(view.delete_account().await, view.notices(), "Deleting account");
            store.clear()?;
            println!("{}", "✅ Account deleted".green());
        }
    }

    Ok(())
}

/// Continues on success, exits with the right message otherwise.
fn ensure(outcome: Outcome, notices: &Notices, action: &str) {
    match outcome {
        Outcome::Completed => {}
        Outcome::Declined => {
            println!("Cancelled.");
            std::process::exit(0);
        }
        Outcome::AlreadyPending => {
            println!("{}", format!("❌ {} is already in progress", action).red());
            std::process::exit(1);
        }
        Outcome::Invalid(reason) => {
            println!("{}", format!("❌ {}", reason).red());
            std::process::exit(1);
        }
        Outcome::NeedsLogin => {
            println!("{}", "❌ Not logged in (or the session expired)".red());
            println!("   Please login first: social-cli login --email <email> --password <password>");
            std::process::exit(1);
        }
        Outcome::Failed | Outcome::Discarded => {
            let message = notices
                .error()
                .unwrap_or_else(|| format!("{} failed", action));
            println!("{}", format!("❌ {}", message).red());
            std::process::exit(1);
        }
    }
}

fn print_success_banner(notices: &Notices) {
    if let Some(message) = notices.success() {
        println!("{}", format!("✅ {}", message).green());
    }
}

fn print_post(post: &Post) {
    let author = post
        .author
        .as_ref()
        .map(|a| a.display_name())
        .unwrap_or_else(|| "unknown".to_string());
    println!("   [{}] {} by {}", post.id, post.title, author);
    println!(
        "      {} | 👍 {} | 💬 {}",
        local_time(post.created_at),
        post.likes,
        post.comments.len()
    );
    println!("      {}", truncate(&post.content, 60));
    for comment in &post.comments {
        let who = comment
            .author
            .as_ref()
            .map(|a| a.username.clone())
            .unwrap_or_else(|| "unknown".to_string());
        println!("      ↳ [{}] {}: {}", comment.id, who, truncate(&comment.content, 50));
    }
    println!();
}

fn describe_status(status: FriendshipStatus) -> String {
    match status {
        FriendshipStatus::None => "Not connected (social-cli add --id <user id>)".to_string(),
        FriendshipStatus::OutgoingPending => "Friend request pending".to_string(),
        FriendshipStatus::IncomingPending { request_id } => format!(
            "They sent you a request (social-cli accept --id {})",
            request_id
        ),
        FriendshipStatus::Accepted => "Friends ✓".to_string(),
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
