use serde::Deserialize;
use serde_json::Value;

/// GraphQL collection holding settlement-layer claim events
pub const SETTLEMENT_COLLECTION: &str = "numsClaimsModels";
/// GraphQL collection holding appchain cumulative totals
pub const APPCHAIN_COLLECTION: &str = "numsTotalsModels";

/// Claim events; one participant may appear many times
pub fn settlement_query(limit: u32) -> String {
    format!(
        r#"{{
  {collection}(limit: {limit}) {{
    totalCount
    edges {{
      node {{
        player
        ty {{
          TOKEN {{
            amount
          }}
        }}
      }}
    }}
  }}
}}"#,
        collection = SETTLEMENT_COLLECTION,
        limit = limit
    )
}

/// Cumulative totals; one authoritative row per participant
pub fn appchain_query(limit: u32) -> String {
    format!(
        r#"{{
  {collection}(limit: {limit}) {{
    totalCount
    edges {{
      node {{
        player
        rewards_earned
      }}
    }}
  }}
}}"#,
        collection = APPCHAIN_COLLECTION,
        limit = limit
    )
}

/// Envelope of every GraphQL response
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Value>,
}

/// Relay-style connection
#[derive(Debug, Deserialize)]
pub struct Connection<N> {
    #[serde(rename = "totalCount")]
    pub total_count: Option<u64>,
    pub edges: Option<Vec<Edge<N>>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<N> {
    pub node: Option<N>,
}

#[derive(Debug, Deserialize)]
pub struct SettlementData {
    #[serde(rename = "numsClaimsModels")]
    pub claims: Option<Connection<ClaimNode>>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimNode {
    pub player: Option<Value>,
    pub ty: Option<ClaimKind>,
}

/// Claim variants; only token claims carry an amount
#[derive(Debug, Deserialize)]
pub struct ClaimKind {
    #[serde(rename = "TOKEN")]
    pub token: Option<TokenClaim>,
}

#[derive(Debug, Deserialize)]
pub struct TokenClaim {
    pub amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AppchainData {
    #[serde(rename = "numsTotalsModels")]
    pub totals: Option<Connection<TotalNode>>,
}

#[derive(Debug, Deserialize)]
pub struct TotalNode {
    pub player: Option<Value>,
    pub rewards_earned: Option<Value>,
}

/// Uniform access to the participant and amount of an edge node
pub trait RewardNode {
    fn player(&self) -> Option<&Value>;
    fn amount(&self) -> Option<&Value>;
}

impl RewardNode for ClaimNode {
    fn player(&self) -> Option<&Value> {
        self.player.as_ref()
    }

    /// An empty token amount is treated as no amount
    fn amount(&self) -> Option<&Value> {
        self.ty
            .as_ref()
            .and_then(|ty| ty.token.as_ref())
            .and_then(|token| token.amount.as_ref())
            .filter(|amount| amount.as_str() != Some(""))
    }
}

impl RewardNode for TotalNode {
    fn player(&self) -> Option<&Value> {
        self.player.as_ref()
    }

    fn amount(&self) -> Option<&Value> {
        self.rewards_earned.as_ref()
    }
}
