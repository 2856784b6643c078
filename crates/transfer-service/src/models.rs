//! Data models for Transfer Service

use chrono::{DateTime, Duration, Utc};
use devcred_common::DeveloperAddress;
use serde::{Deserialize, Serialize};

/// Cross-chain transfer status, as reported by the bridge aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Submitted, not yet picked up on the source chain
    Pending,
    /// In flight between chains
    Ongoing,
    /// Funds arrived on the destination chain
    Done,
    /// The bridge gave up; funds did not arrive
    Failed,
}

impl TransferStatus {
    /// Terminal statuses are never polled again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Done | TransferStatus::Failed)
    }
}

/// Parameters for requesting a transfer quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub source_chain: String,

    pub dest_chain: String,

    pub from_token: String,

    pub to_token: String,

    /// Amount on the source chain, in token minor units
    pub from_amount: u64,
}

/// Route estimate returned by the bridge aggregator for a quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEstimate {
    /// Expected amount on the destination chain after fees
    pub estimated_to_amount: u64,

    /// Total bridge fees, in source token minor units
    pub fee_amount: u64,

    /// Expected transfer duration
    pub estimated_duration_secs: u64,

    /// Human-readable route description (bridges and hops)
    pub route: String,
}

/// A non-binding, time-bounded transfer estimate.
///
/// Immutable once issued; executing it past `expires_at`, or a second time,
/// is rejected rather than silently re-quoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeQuote {
    pub id: String,

    pub source_chain: String,

    pub dest_chain: String,

    pub from_token: String,

    pub to_token: String,

    pub from_amount: u64,

    pub estimated_to_amount: u64,

    pub fee_amount: u64,

    pub estimated_duration_secs: u64,

    pub route: String,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl BridgeQuote {
    /// Assemble a quote from a request and the bridge's route estimate
    pub fn new(request: &QuoteRequest, estimate: RouteEstimate, validity_secs: u64) -> Self {
        let issued_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_chain: request.source_chain.clone(),
            dest_chain: request.dest_chain.clone(),
            from_token: request.from_token.clone(),
            to_token: request.to_token.clone(),
            from_amount: request.from_amount,
            estimated_to_amount: estimate.estimated_to_amount,
            fee_amount: estimate.fee_amount,
            estimated_duration_secs: estimate.estimated_duration_secs,
            route: estimate.route,
            issued_at,
            expires_at: issued_at + Duration::seconds(validity_secs as i64),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// One cross-chain transfer, recorded at execution time.
///
/// History is append-only; records are mutated only by status polling and
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Transaction hash plus a disambiguating timestamp, since a hash could
    /// in principle be replayed across polls
    pub id: String,

    pub developer: DeveloperAddress,

    /// Quote this transfer was executed from
    pub quote_id: String,

    pub source_chain: String,

    pub dest_chain: String,

    pub from_token: String,

    pub to_token: String,

    pub from_amount: u64,

    pub estimated_to_amount: u64,

    pub tx_hash: String,

    pub status: TransferStatus,

    pub route: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Record a newly executed transfer in its initial state
    pub fn new(quote: &BridgeQuote, developer: DeveloperAddress, tx_hash: String) -> Self {
        let created_at = Utc::now();
        Self {
            id: format!("{}-{}", tx_hash, created_at.timestamp_millis()),
            developer,
            quote_id: quote.id.clone(),
            source_chain: quote.source_chain.clone(),
            dest_chain: quote.dest_chain.clone(),
            from_token: quote.from_token.clone(),
            to_token: quote.to_token.clone(),
            from_amount: quote.from_amount,
            estimated_to_amount: quote.estimated_to_amount,
            tx_hash,
            status: TransferStatus::Pending,
            route: quote.route.clone(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a polled status. Terminal records never change again; a repeat
    /// of the current status only refreshes `updated_at`.
    pub fn apply_status(&mut self, status: TransferStatus) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Request to execute a previously issued quote
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub developer: DeveloperAddress,

    pub quote_id: String,
}

/// Response from a manual poll cycle
#[derive(Debug, Serialize)]
pub struct PollResponse {
    /// Records still in a non-terminal state after the cycle
    pub remaining_in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> BridgeQuote {
        let request = QuoteRequest {
            source_chain: "base".to_string(),
            dest_chain: "arbitrum".to_string(),
            from_token: "USDC".to_string(),
            to_token: "USDC".to_string(),
            from_amount: 1_000_000,
        };
        let estimate = RouteEstimate {
            estimated_to_amount: 998_500,
            fee_amount: 1_500,
            estimated_duration_secs: 120,
            route: "base -> cctp -> arbitrum".to_string(),
        };
        BridgeQuote::new(&request, estimate, 60)
    }

    #[test]
    fn test_quote_expiry_window() {
        let quote = quote();

        assert!(!quote.is_expired(quote.issued_at));
        assert!(!quote.is_expired(quote.issued_at + Duration::seconds(59)));
        assert!(quote.is_expired(quote.issued_at + Duration::seconds(60)));
    }

    #[test]
    fn test_record_id_derives_from_hash_and_timestamp() {
        let developer = DeveloperAddress::new([9u8; 20]);
        let record = TransferRecord::new(&quote(), developer, "0xdeadbeef".to_string());

        assert_eq!(
            record.id,
            format!("0xdeadbeef-{}", record.created_at.timestamp_millis())
        );
        assert_eq!(record.status, TransferStatus::Pending);
    }

    #[test]
    fn test_status_progression() {
        let developer = DeveloperAddress::new([9u8; 20]);
        let mut record = TransferRecord::new(&quote(), developer, "0xabc".to_string());

        record.apply_status(TransferStatus::Ongoing);
        assert_eq!(record.status, TransferStatus::Ongoing);
        assert!(!record.is_terminal());

        record.apply_status(TransferStatus::Done);
        assert!(record.is_terminal());
    }

    #[test]
    fn test_terminal_records_never_change() {
        let developer = DeveloperAddress::new([9u8; 20]);
        let mut record = TransferRecord::new(&quote(), developer, "0xabc".to_string());

        record.apply_status(TransferStatus::Failed);
        let stamped = record.updated_at;

        record.apply_status(TransferStatus::Done);
        assert_eq!(record.status, TransferStatus::Failed);
        assert_eq!(record.updated_at, stamped);
    }

    #[test]
    fn test_status_serialization_matches_bridge_wire_format() {
        let json = serde_json::to_string(&TransferStatus::Ongoing).unwrap();
        assert_eq!(json, "\"ONGOING\"");

        let parsed: TransferStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, TransferStatus::Failed);
    }
}
