use crate::model::{DataItem, DataType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
  #[default]
  Newest,
  Oldest,
  Title,
}

impl SortBy {
  pub fn label(&self) -> &'static str {
    match self {
      SortBy::Newest => "Newest First",
      SortBy::Oldest => "Oldest First",
      SortBy::Title => "Title A-Z",
    }
  }

  /// The option after this one, wrapping around.
  pub fn next(&self) -> SortBy {
    match self {
      SortBy::Newest => SortBy::Oldest,
      SortBy::Oldest => SortBy::Title,
      SortBy::Title => SortBy::Newest,
    }
  }
}

impl std::str::FromStr for SortBy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "newest" => Ok(SortBy::Newest),
      "oldest" => Ok(SortBy::Oldest),
      "title" => Ok(SortBy::Title),
      other => Err(format!("Unknown sort '{}' (newest, oldest, title)", other)),
    }
  }
}

/// Knowledge-base filter state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
  pub search: String,
  /// `None` shows every type
  pub item_type: Option<DataType>,
  pub sort: SortBy,
}

impl ItemFilter {
  pub fn is_active(&self) -> bool {
    !self.search.is_empty()
  }
}

fn matches_search(item: &DataItem, needle: &str) -> bool {
  item.title.to_lowercase().contains(needle)
    || item
      .description
      .as_deref()
      .is_some_and(|d| d.to_lowercase().contains(needle))
    || item.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Items matching `filter`, in its sort order.
pub fn filter_and_sort(items: &[DataItem], filter: &ItemFilter) -> Vec<DataItem> {
  let needle = filter.search.trim().to_lowercase();

  let mut out: Vec<DataItem> = items
    .iter()
    .filter(|item| filter.item_type.map_or(true, |t| item.item_type() == t))
    .filter(|item| needle.is_empty() || matches_search(item, &needle))
    .cloned()
    .collect();

  match filter.sort {
    SortBy::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    SortBy::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    SortBy::Title => out.sort_by(|a, b| {
      a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
    }),
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ItemKind;
  use chrono::{TimeZone, Utc};

  fn item(id: &str, title: &str, day: u32, kind: ItemKind) -> DataItem {
    let at = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
    DataItem {
      id: id.to_string(),
      title: title.to_string(),
      description: None,
      file_url: None,
      file_name: None,
      file_size: None,
      tags: Vec::new(),
      user_id: "u1".to_string(),
      project_id: "p1".to_string(),
      created_at: at,
      updated_at: at,
      kind,
    }
  }

  fn context(id: &str, title: &str, day: u32) -> DataItem {
    item(id, title, day, ItemKind::Context { content: None })
  }

  fn ids(items: &[DataItem]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
  }

  #[test]
  fn test_search_covers_title_description_and_tags() {
    let mut by_desc = context("2", "Shipping", 2);
    by_desc.description = Some("Delivery REFUNDS policy".to_string());
    let mut by_tag = context("3", "Returns", 3);
    by_tag.tags = vec!["Refunds".to_string()];
    let items = vec![context("1", "Refunds FAQ", 1), by_desc, by_tag, context("4", "Pricing", 4)];

    let filter = ItemFilter {
      search: "refunds".to_string(),
      ..ItemFilter::default()
    };
    assert_eq!(ids(&filter_and_sort(&items, &filter)), vec!["3", "2", "1"]);
  }

  #[test]
  fn test_type_filter_is_exact() {
    let items = vec![
      context("1", "Doc", 1),
      item("2", "Mug", 2, ItemKind::Product { price: Some(3.0), affiliate_link: None }),
    ];
    let filter = ItemFilter {
      item_type: Some(DataType::Product),
      ..ItemFilter::default()
    };
    assert_eq!(ids(&filter_and_sort(&items, &filter)), vec!["2"]);
  }

  #[test]
  fn test_sort_orders() {
    let items = vec![context("1", "beta", 2), context("2", "Alpha", 1), context("3", "gamma", 3)];
    let mut filter = ItemFilter::default();

    assert_eq!(ids(&filter_and_sort(&items, &filter)), vec!["3", "1", "2"]);
    filter.sort = SortBy::Oldest;
    assert_eq!(ids(&filter_and_sort(&items, &filter)), vec!["2", "1", "3"]);
    filter.sort = SortBy::Title;
    assert_eq!(ids(&filter_and_sort(&items, &filter)), vec!["2", "1", "3"]);
  }

  #[test]
  fn test_sort_cycle_and_parse() {
    assert_eq!(SortBy::Title.next(), SortBy::Newest);
    assert_eq!("Oldest".parse::<SortBy>(), Ok(SortBy::Oldest));
    assert!("random".parse::<SortBy>().is_err());
  }
}
