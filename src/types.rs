use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};

/// A user record, reduced to what the migrations touch.
///
/// `id` is the string form of the document's ObjectId, which is the form the
/// application stores in `friends`, `ownerId` and `subscribers` fields.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(rename = "_id", deserialize_with = "object_id_as_hex")]
    pub id: String,
    #[serde(default)]
    pub friends: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "ownerId", default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub subscribers: Vec<String>,
    #[serde(rename = "inviteId", default)]
    pub invite_id: Option<String>,
    #[serde(rename = "isPublic", default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "ownerId", default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(rename = "inviteId", default)]
    pub invite_id: Option<String>,
}

/// One entry of an event's `participants` array. The array elements carry
/// more fields (per-participant wishlists), but only the user id matters here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// A group-membership record: the common shape of wishlists and events that
/// the friend-graph backfill operates on. The owner and every member of a
/// group are considered mutual friends of each other.
#[derive(Debug, Clone)]
pub struct Group {
    /// Human-readable name, for logs only.
    pub label: String,
    pub owner_id: Option<String>,
    pub member_ids: Vec<String>,
}

impl Wishlist {
    pub fn to_group(&self) -> Group {
        Group {
            label: display_name(&self.name),
            owner_id: self.owner_id.clone(),
            member_ids: self
                .subscribers
                .iter()
                .filter(|id| !id.is_empty())
                .cloned()
                .collect(),
        }
    }
}

impl Event {
    pub fn to_group(&self) -> Group {
        Group {
            label: display_name(&self.name),
            owner_id: self.owner_id.clone(),
            member_ids: self
                .participants
                .iter()
                .filter_map(|p| p.user_id.clone())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }
}

fn display_name(name: &Option<String>) -> String {
    name.clone().unwrap_or_else(|| "Unknown".to_string())
}

fn object_id_as_hex<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let oid = ObjectId::deserialize(deserializer)?;
    Ok(oid.to_hex())
}
