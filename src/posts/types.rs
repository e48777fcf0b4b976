/// A post as shown in the list and detail views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
  pub id: u64,
  pub user_id: Option<u64>,
  pub title: String,
  pub body: String,
}
