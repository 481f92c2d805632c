mod chat;
mod data_list;
mod item_detail;
mod message;
mod project_list;

pub use chat::ChatView;
pub use data_list::DataListView;
pub use item_detail::ItemDetailView;
pub use message::MessageView;
pub use project_list::ProjectListView;

use crate::context::Context;
use crate::routes::Route;
use crate::ui::view::View;

/// Root view for a route
pub fn open(route: &Route, ctx: &Context) -> Box<dyn View> {
  if route.requires_auth() && ctx.user.is_none() {
    return Box::new(MessageView::new(
      route.title(),
      format!(
        "{} requires sign-in. Run `chatdeck login --email <email>` and start again.",
        route.path()
      ),
    ));
  }

  match route {
    Route::Projects | Route::Dashboard => Box::new(ProjectListView::new(ctx.clone())),
    Route::ProjectDetail { slug } => Box::new(DataListView::for_slug(ctx.clone(), slug)),
    Route::DataLibrary => Box::new(DataListView::library(ctx.clone())),
    Route::PublicChat { slug } => Box::new(ChatView::public(ctx, slug)),
    Route::AdminChat { slug } => Box::new(ChatView::admin(ctx, slug)),
    Route::Landing
    | Route::GetStarted
    | Route::Discover
    | Route::Settings
    | Route::HelpSupport
    | Route::AdminDiscover
    | Route::Playground
    | Route::QuickCreate => Box::new(MessageView::new(
      route.title(),
      format!("{} is only available in the web dashboard.", route.path()),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::fixtures::context;
  use crate::testutil::{backends, user};

  #[tokio::test]
  async fn test_open_maps_routes_to_views() {
    let (_memory, backend) = backends();
    let ctx = context(backend, Some(user("u1")));

    assert_eq!(open(&Route::Projects, &ctx).breadcrumb_label(), "Projects");
    assert_eq!(open(&Route::DataLibrary, &ctx).breadcrumb_label(), "Data Library");
    assert_eq!(
      open(&Route::parse("/admin/projects/support-bot"), &ctx).breadcrumb_label(),
      "support-bot"
    );
    assert_eq!(open(&Route::Settings, &ctx).breadcrumb_label(), "Settings");
  }

  #[tokio::test]
  async fn test_admin_routes_need_a_user() {
    let (_memory, backend) = backends();
    let ctx = context(backend, None);

    // Sign-in page instead of the project's data
    let view = open(&Route::parse("/admin/projects/support-bot"), &ctx);
    assert_eq!(view.breadcrumb_label(), "Project");

    // Public chat stays reachable
    let view = open(&Route::parse("/chat/help"), &ctx);
    assert_eq!(view.breadcrumb_label(), "help");
  }
}
