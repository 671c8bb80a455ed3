//! JSON bodies posted to the storage node.

use serde::Serialize;
use serde_json::value::RawValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedPp {
    pub p2p_address: String,
    pub p2p_pubkey: String,
    pub ozone_limit_changes: String,
    pub tx_hash: String,
    pub initial_deposit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedPpReq {
    pub pp_list: Vec<ActivatedPp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedBeneficiaryPp {
    pub p2p_address: String,
    pub beneficiary_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedBeneficiaryPpReq {
    pub pp_list: Vec<UpdatedBeneficiaryPp>,
}

/// Deposit change of a resource or meta node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedDeposit {
    pub p2p_address: String,
    pub ozone_limit_changes: String,
    pub tx_hash: String,
    pub deposit_delta: String,
    pub current_deposit: String,
    pub available_token_before: String,
    pub available_token_after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedDepositPpReq {
    pub pp_list: Vec<UpdatedDeposit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedDepositSpReq {
    pub sp_list: Vec<UpdatedDeposit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unbonding {
    pub p2p_address: String,
    pub unbonding_mature_time: String,
    pub tx_hash: String,
    pub deposit_to_remove: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbondingPpReq {
    pub pp_list: Vec<Unbonding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbondingSpReq {
    pub sp_list: Vec<Unbonding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedSp {
    pub p2p_address: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedSpReq {
    pub sp_list: Vec<ActivatedSp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prepaid {
    pub wallet_address: String,
    pub purchased_uoz: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepaidReq {
    pub wallet_list: Vec<Prepaid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uploaded {
    pub reporter_address: String,
    pub uploader_address: String,
    pub file_hash: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUploadedReq {
    pub upload_list: Vec<Uploaded>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeReportedReq {
    pub epochs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlashedPp {
    pub p2p_address: String,
    pub query_first: bool,
    pub suspended: bool,
    pub slashed_amt: BigInteger,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlashedPpReq {
    pub pp_list: Vec<SlashedPp>,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedEffectiveDepositPp {
    pub p2p_address: String,
    pub is_unsuspended_during_update: bool,
    pub effective_deposit_after: BigInteger,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedEffectiveDepositPpReq {
    pub pp_list: Vec<UpdatedEffectiveDepositPp>,
    pub tx_hash: String,
}

/// Base-10 integer of any size, serialised as a bare JSON number.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct BigInteger(Box<RawValue>);

impl BigInteger {
    /// Accepts an optional sign followed by decimal digits.
    pub fn parse(value: &str) -> Option<Self> {
        let (negative, digits) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let trimmed = digits.trim_start_matches('0');
        let normalized = match (trimmed.is_empty(), negative) {
            (true, _) => "0".to_string(),
            (false, true) => format!("-{trimmed}"),
            (false, false) => trimmed.to_string(),
        };
        RawValue::from_string(normalized).ok().map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for BigInteger {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Boolean in any of the spellings the chain emits.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
