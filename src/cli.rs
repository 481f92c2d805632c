//! One-shot subcommands. Each runs against a fresh [`Context`] and prints
//! plain text to stdout.

use clap::{Args, Subcommand};
use color_eyre::{eyre::bail, eyre::eyre, Result};
use serde_json::{Map, Value};
use std::io::{BufRead, Write};
use std::time::Duration;

use crate::config::Config;
use crate::context::Context;
use crate::data::{filter_and_sort, ItemFilter, SortBy};
use crate::model::{
  CreateDataInput, DataItem, DataType, DataUpdate, ItemKind, NewProject, Plan, Project,
  ProjectUpdate,
};
use crate::projects::{LoadStatus, ProjectSync};
use crate::routes::Route;
use crate::ui::renderfns::{format_date, format_file_size};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Start the terminal UI at a path (default: /admin/projects)
  Tui { path: Option<String> },
  /// Sign in with email and password (CHATDECK_PASSWORD or prompt)
  Login {
    #[arg(long)]
    email: String,
  },
  /// Sign out and drop cached projects
  Logout,
  /// Show the signed-in user
  Whoami,
  /// List your projects
  Projects {
    /// Skip the cache
    #[arg(long)]
    refresh: bool,
  },
  /// Create, update, delete or show a project
  #[command(subcommand)]
  Project(ProjectCommand),
  /// Show a public chatbot page
  Chat { slug: String },
  /// Manage knowledge-base items
  #[command(subcommand)]
  Data(DataCommand),
  /// Resolve a path against the route table
  Route { path: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
  Create {
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    plan: Option<Plan>,
    #[arg(long)]
    public: bool,
    /// Defaults to a slug derived from the name
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    custom_slug: Option<String>,
  },
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    plan: Option<Plan>,
    #[arg(long)]
    public: Option<bool>,
    #[arg(long)]
    slug: Option<String>,
    /// Pass an empty value to clear it
    #[arg(long)]
    custom_slug: Option<String>,
  },
  Delete { id: String },
  /// One of your projects by slug
  Show { slug: String },
}

#[derive(Subcommand, Debug)]
pub enum DataCommand {
  List {
    /// Project slug; every project when absent
    #[arg(long)]
    project: Option<String>,
    #[arg(long = "type")]
    item_type: Option<DataType>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "newest")]
    sort: SortBy,
  },
  Create(CreateArgs),
  Update {
    item_type: DataType,
    id: String,
    #[command(flatten)]
    fields: ItemFields,
  },
  Delete {
    id: String,
    /// Looked up from your items when absent
    #[arg(long = "type")]
    item_type: Option<DataType>,
  },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
  pub item_type: DataType,
  /// Project slug
  #[arg(long)]
  pub project: String,
  #[command(flatten)]
  pub fields: ItemFields,
}

/// Columns shared by create and update
#[derive(Args, Debug, Default, Clone)]
pub struct ItemFields {
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub content: Option<String>,
  #[arg(long = "tag")]
  pub tags: Vec<String>,
  #[arg(long)]
  pub file_url: Option<String>,
  #[arg(long)]
  pub file_name: Option<String>,
  #[arg(long)]
  pub file_size: Option<u64>,
  /// Issues: low, medium, high, critical
  #[arg(long)]
  pub severity: Option<String>,
  /// Issues: open, in-progress, resolved, closed
  #[arg(long)]
  pub status: Option<String>,
  /// Products
  #[arg(long)]
  pub price: Option<String>,
  /// Products
  #[arg(long)]
  pub link: Option<String>,
}

impl ItemFields {
  pub fn into_create(self, item_type: DataType, project_id: &str) -> CreateDataInput {
    let mut input = CreateDataInput::new(item_type, project_id, self.title.unwrap_or_default());
    input.description = self.description;
    input.content = self.content;
    input.file_url = self.file_url;
    input.file_name = self.file_name;
    input.file_size = self.file_size;
    input.tags = self.tags;

    match item_type {
      DataType::Issue => {
        if let Some(severity) = self.severity {
          input = input.with_meta("severity", severity);
        }
        if let Some(status) = self.status {
          input = input.with_meta("status", status);
        }
        input
      }
      DataType::Product => {
        if let Some(price) = self.price {
          input = input.with_meta("price", price);
        }
        if let Some(link) = self.link {
          input = input.with_meta("affiliateLink", link);
        }
        input
      }
      DataType::Context | DataType::Inquiry => input,
    }
  }

  pub fn into_update(self) -> DataUpdate {
    let mut meta = Map::new();
    let fields = [
      ("severity", self.severity),
      ("status", self.status),
      ("price", self.price),
      ("affiliateLink", self.link),
    ];
    for (key, value) in fields {
      if let Some(value) = value {
        meta.insert(key.to_string(), Value::String(value));
      }
    }

    DataUpdate {
      title: self.title,
      description: self.description,
      content: self.content,
      file_url: self.file_url,
      file_name: self.file_name,
      file_size: self.file_size,
      tags: (!self.tags.is_empty()).then_some(self.tags),
      metadata: (!meta.is_empty()).then_some(meta),
    }
  }
}

/// Run a subcommand other than `tui`.
pub async fn run(command: Command, config: Config) -> Result<()> {
  if let Command::Route { path } = &command {
    print_route(&Route::parse(path));
    return Ok(());
  }

  let ctx = Context::connect(config).await?;

  match command {
    Command::Tui { .. } | Command::Route { .. } => Ok(()),
    Command::Login { email } => login(&ctx, &email).await,
    Command::Logout => {
      ctx.auth.sign_out().await;
      println!("Signed out");
      Ok(())
    }
    Command::Whoami => {
      match &ctx.user {
        Some(user) => println!("{} <{}> ({})", user.label(), user.email, user.id),
        None => println!("Not signed in"),
      }
      Ok(())
    }
    Command::Projects { refresh } => list_projects(&ctx, refresh).await,
    Command::Project(cmd) => project(&ctx, cmd).await,
    Command::Chat { slug } => {
      let project = ctx.projects.public_by_slug(&slug).await?;
      print_project(&project);
      Ok(())
    }
    Command::Data(cmd) => data(&ctx, cmd).await,
  }
}

fn read_password() -> Result<String> {
  if let Ok(password) = Config::get_password() {
    return Ok(password);
  }

  print!("Password: ");
  std::io::stdout()
    .flush()
    .map_err(|e| eyre!("Failed to write prompt: {}", e))?;

  let mut line = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut line)
    .map_err(|e| eyre!("Failed to read password: {}", e))?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(ctx: &Context, email: &str) -> Result<()> {
  let password = read_password()?;
  let session = ctx.auth.sign_in(email, &password).await?;
  println!("Signed in as {}", session.user.label());
  Ok(())
}

/// CLI consumers skip the loading smoothing.
fn sync(ctx: &Context) -> Result<ProjectSync> {
  if ctx.user.is_none() {
    bail!("Not signed in. Run `chatdeck login --email <email>` first.");
  }
  Ok(ctx.project_sync().with_min_loading(Duration::ZERO))
}

async fn list_projects(ctx: &Context, refresh: bool) -> Result<()> {
  let mut sync = sync(ctx)?;
  let status = if refresh {
    sync.force_refresh()
  } else {
    sync.get_projects()
  };
  sync.settle().await;

  if let Some(e) = sync.error() {
    bail!("Failed to load projects: {}", e);
  }
  if sync.projects().is_empty() {
    println!("No projects");
    return Ok(());
  }

  for project in sync.projects() {
    println!(
      "{:<38} {:<28} {:<9} {:<8} /{}",
      project.id,
      project.name,
      project.plan.as_str(),
      if project.is_public { "public" } else { "private" },
      project.public_slug()
    );
  }
  if matches!(status, LoadStatus::Cached { .. }) {
    println!("(from cache)");
  }
  Ok(())
}

async fn project(ctx: &Context, cmd: ProjectCommand) -> Result<()> {
  let mut sync = sync(ctx)?;

  match cmd {
    ProjectCommand::Create {
      name,
      description,
      plan,
      public,
      slug,
      custom_slug,
    } => {
      let project = sync
        .create(NewProject {
          name,
          description,
          plan,
          is_public: public,
          slug,
          custom_slug,
          social_links: None,
        })
        .await?;
      println!("Project created successfully");
      print_project(&project);
    }
    ProjectCommand::Update {
      id,
      name,
      description,
      plan,
      public,
      slug,
      custom_slug,
    } => {
      let changes = ProjectUpdate {
        name,
        description,
        plan,
        is_public: public,
        slug,
        custom_slug: custom_slug.map(|s| (!s.is_empty()).then_some(s)),
        social_links: None,
      };
      let project = sync.update(&id, changes).await?;
      println!("Project updated successfully");
      print_project(&project);
    }
    ProjectCommand::Delete { id } => {
      sync.delete(&id).await?;
      println!("Project deleted successfully");
    }
    ProjectCommand::Show { slug } => {
      let project = sync.project_by_slug(&slug).await?;
      print_project(&project);
    }
  }
  Ok(())
}

async fn resolve_project_id(ctx: &Context, slug: &str) -> Result<String> {
  let user = ctx
    .user
    .as_ref()
    .ok_or_else(|| eyre!("Not signed in. Run `chatdeck login --email <email>` first."))?;
  Ok(ctx.projects.by_slug(&user.id, slug).await?.id)
}

async fn data(ctx: &Context, cmd: DataCommand) -> Result<()> {
  match cmd {
    DataCommand::List {
      project,
      item_type,
      search,
      sort,
    } => {
      let project_id = match project {
        Some(slug) => Some(resolve_project_id(ctx, &slug).await?),
        None => None,
      };
      let mut store = ctx.data_items(project_id, item_type);
      store.refresh().await;
      if let Some(e) = store.error() {
        bail!("Failed to load data: {}", e);
      }

      let filter = ItemFilter {
        search: search.unwrap_or_default(),
        item_type,
        sort,
      };
      let items = filter_and_sort(store.items(), &filter);
      if items.is_empty() {
        println!("No data items");
      }
      for item in &items {
        print_item_row(item);
      }
    }
    DataCommand::Create(args) => {
      let project_id = resolve_project_id(ctx, &args.project).await?;
      let mut store = ctx.data_items(Some(project_id.clone()), None);
      let item = store
        .create(args.fields.into_create(args.item_type, &project_id))
        .await?;
      println!("{} created successfully", item.item_type().label());
      print_item(&item);
    }
    DataCommand::Update {
      item_type,
      id,
      fields,
    } => {
      let mut store = ctx.data_items(None, None);
      let item = store.update(&id, item_type, fields.into_update()).await?;
      println!("{} updated successfully", item.item_type().label());
      print_item(&item);
    }
    DataCommand::Delete { id, item_type } => {
      let mut store = ctx.data_items(None, None);
      if item_type.is_none() {
        store.refresh().await;
      }
      store.delete(&id, item_type).await?;
      println!("Item deleted successfully");
    }
  }
  Ok(())
}

fn print_route(route: &Route) {
  println!("route:    {:?}", route);
  println!("pattern:  {}", route.pattern());
  println!("path:     {}", route.path());
  println!("title:    {}", route.title());
  println!("auth:     {}", if route.requires_auth() { "required" } else { "public" });
}

fn print_project(project: &Project) {
  println!("id:          {}", project.id);
  println!("name:        {}", project.name);
  if !project.description.is_empty() {
    println!("description: {}", project.description);
  }
  println!("plan:        {}", project.plan.as_str());
  println!("slug:        {}", project.slug);
  if let Some(custom) = &project.custom_slug {
    println!("custom slug: {}", custom);
  }
  println!("public:      {}", project.is_public);
  println!("created:     {}", format_date(&project.created_at));
}

fn print_item_row(item: &DataItem) {
  println!(
    "{:<38} {:<8} {:<40} {}",
    item.id,
    item.item_type().as_str(),
    item.title,
    format_date(&item.created_at)
  );
}

fn print_item(item: &DataItem) {
  println!("id:          {}", item.id);
  println!("type:        {}", item.item_type().as_str());
  println!("title:       {}", item.title);
  if let Some(description) = &item.description {
    println!("description: {}", description);
  }
  if let Some(content) = item.content() {
    println!("content:     {}", content);
  }
  match &item.kind {
    ItemKind::Issue { severity, status } => {
      println!("severity:    {}", severity.as_str());
      println!("status:      {}", status.as_str());
    }
    ItemKind::Product {
      price,
      affiliate_link,
    } => {
      if let Some(price) = price {
        println!("price:       {:.2}", price);
      }
      if let Some(link) = affiliate_link {
        println!("link:        {}", link);
      }
    }
    ItemKind::Context { .. } | ItemKind::Inquiry { .. } => {}
  }
  if let (Some(name), size) = (&item.file_name, item.file_size) {
    println!("file:        {} {}", name, size.map(format_file_size).unwrap_or_default());
  }
  if !item.tags.is_empty() {
    println!("tags:        {}", item.tags.join(", "));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::AppError;

  #[test]
  fn test_issue_status_defaults_to_open() {
    let fields = ItemFields {
      title: Some("Checkout broken".to_string()),
      severity: Some("high".to_string()),
      ..ItemFields::default()
    };
    let input = fields.into_create(DataType::Issue, "p1");
    assert!(!input.metadata.contains_key("status"));

    let row = input.into_row("u1").unwrap();
    assert_eq!(row["severity"], "high");
    assert_eq!(row["status"], "open");
  }

  #[test]
  fn test_issue_without_severity_is_rejected() {
    let fields = ItemFields {
      title: Some("Checkout broken".to_string()),
      ..ItemFields::default()
    };
    let err = fields.into_create(DataType::Issue, "p1").into_row("u1").unwrap_err();
    assert_eq!(err, AppError::validation("Please select a severity level"));
  }

  #[test]
  fn test_update_only_sets_given_fields() {
    let fields = ItemFields {
      price: Some("19.5".to_string()),
      ..ItemFields::default()
    };
    let update = fields.into_update();
    assert_eq!(update.title, None);
    assert_eq!(update.tags, None);

    let row = update.into_row(DataType::Product).unwrap();
    assert_eq!(row, serde_json::json!({"price": 19.5}));
  }
}
