//! Per message type request builders.
//!
//! Each builder turns the complete [`ProcessedEvent`]s of one transaction
//! into the storage node request body, sorting every event into accepted,
//! filtered or invalid.

use serde::Serialize;
use serde_json::value::RawValue;

use crate::events::extract::{ProcessedEvent, RequiredAttribute};
use crate::events::requests::*;
use crate::events::types::*;

const fn req(event_type: &'static str, attribute: &'static str) -> RequiredAttribute {
    RequiredAttribute::new(event_type, attribute)
}

pub const CREATE_RESOURCE_NODE: &[RequiredAttribute] = &[
    req(EVENT_TYPE_CREATE_RESOURCE_NODE, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_CREATE_RESOURCE_NODE, ATTRIBUTE_KEY_PUBKEY),
    req(EVENT_TYPE_CREATE_RESOURCE_NODE, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
    req(EVENT_TYPE_CREATE_RESOURCE_NODE, ATTRIBUTE_KEY_INITIAL_DEPOSIT),
];

pub const UPDATE_RESOURCE_NODE: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE, ATTRIBUTE_KEY_SENDER),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE, ATTRIBUTE_KEY_BENEFICIARY_ADDRESS),
];

pub const UPDATE_RESOURCE_NODE_DEPOSIT: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_DEPOSIT_DELTA),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_CURRENT_DEPOSIT),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_AVAILABLE_TOKEN_BEFORE),
    req(EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, ATTRIBUTE_KEY_AVAILABLE_TOKEN_AFTER),
];

pub const UNBONDING_RESOURCE_NODE: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UNBONDING_RESOURCE_NODE, ATTRIBUTE_KEY_RESOURCE_NODE),
    req(EVENT_TYPE_UNBONDING_RESOURCE_NODE, ATTRIBUTE_KEY_UNBONDING_MATURE_TIME),
    req(EVENT_TYPE_UNBONDING_RESOURCE_NODE, ATTRIBUTE_KEY_DEPOSIT_TO_REMOVE),
];

pub const UPDATE_META_NODE_DEPOSIT: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_DEPOSIT_DELTA),
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_CURRENT_DEPOSIT),
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_AVAILABLE_TOKEN_BEFORE),
    req(EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, ATTRIBUTE_KEY_AVAILABLE_TOKEN_AFTER),
];

pub const UNBONDING_META_NODE: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UNBONDING_META_NODE, ATTRIBUTE_KEY_META_NODE),
    req(EVENT_TYPE_UNBONDING_META_NODE, ATTRIBUTE_KEY_UNBONDING_MATURE_TIME),
    req(EVENT_TYPE_UNBONDING_META_NODE, ATTRIBUTE_KEY_DEPOSIT_TO_REMOVE),
];

pub const META_NODE_REG_VOTE: &[RequiredAttribute] = &[
    req(EVENT_TYPE_META_NODE_REG_VOTE, ATTRIBUTE_KEY_CANDIDATE_NETWORK_ADDRESS),
    req(EVENT_TYPE_META_NODE_REG_VOTE, ATTRIBUTE_KEY_CANDIDATE_STATUS),
    req(EVENT_TYPE_META_NODE_REG_VOTE, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
];

pub const PREPAY: &[RequiredAttribute] = &[
    req(EVENT_TYPE_PREPAY, ATTRIBUTE_KEY_SENDER),
    req(EVENT_TYPE_PREPAY, ATTRIBUTE_KEY_BENEFICIARY),
    req(EVENT_TYPE_PREPAY, ATTRIBUTE_KEY_PURCHASED_NOZ),
];

pub const FILE_UPLOAD: &[RequiredAttribute] = &[
    req(EVENT_TYPE_FILE_UPLOAD, ATTRIBUTE_KEY_REPORTER),
    req(EVENT_TYPE_FILE_UPLOAD, ATTRIBUTE_KEY_UPLOADER),
    req(EVENT_TYPE_FILE_UPLOAD, ATTRIBUTE_KEY_FILE_HASH),
];

pub const VOLUME_REPORT: &[RequiredAttribute] = &[req(EVENT_TYPE_VOLUME_REPORT, ATTRIBUTE_KEY_EPOCH)];

pub const SLASHING: &[RequiredAttribute] = &[
    req(EVENT_TYPE_SLASHING, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_SLASHING, ATTRIBUTE_KEY_NODE_SUSPENDED),
    req(EVENT_TYPE_SLASHING, ATTRIBUTE_KEY_AMOUNT),
];

pub const UPDATE_EFFECTIVE_DEPOSIT: &[RequiredAttribute] = &[
    req(EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT, ATTRIBUTE_KEY_NETWORK_ADDRESS),
    req(EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT, ATTRIBUTE_KEY_IS_UNSUSPENDED),
    req(EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT, ATTRIBUTE_KEY_EFFECTIVE_DEPOSIT_AFTER),
];

/// Output of a builder.
#[derive(Debug, Default)]
pub struct Built {
    /// `None` when nothing was accepted.
    pub body: Option<Box<RawValue>>,
    pub accepted: usize,
    /// Events skipped on purpose, not counted as errors.
    pub filtered: usize,
}

pub type BuildFn = fn(&[ProcessedEvent], &str) -> Built;

enum Entry<T> {
    Accept(T),
    Filtered,
    Invalid(String),
}

fn collect<T>(
    events: &[ProcessedEvent],
    mut sort: impl FnMut(&ProcessedEvent) -> Entry<T>,
) -> (Vec<T>, usize) {
    let mut accepted = Vec::with_capacity(events.len());
    let mut filtered = 0;
    for event in events {
        match sort(event) {
            Entry::Accept(item) => accepted.push(item),
            Entry::Filtered => filtered += 1,
            Entry::Invalid(reason) => tracing::debug!(reason = %reason, "Invalid event attribute"),
        }
    }
    (accepted, filtered)
}

fn finish<R: Serialize>(request: &R, accepted: usize, filtered: usize) -> Built {
    if accepted == 0 {
        return Built {
            body: None,
            accepted,
            filtered,
        };
    }
    match serde_json::value::to_raw_value(request) {
        Ok(body) => Built {
            body: Some(body),
            accepted,
            filtered,
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode storage node request");
            Built {
                body: None,
                accepted: 0,
                filtered,
            }
        }
    }
}

fn value(event: &ProcessedEvent, event_type: &str, attribute: &str) -> String {
    event.get(event_type, attribute).unwrap_or_default().to_string()
}

pub fn create_resource_node(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_CREATE_RESOURCE_NODE;
    let (pp_list, filtered) = collect(events, |event| {
        let raw = value(event, e, ATTRIBUTE_KEY_PUBKEY);
        let Ok(pubkey) = hex::decode(&raw) else {
            return Entry::Invalid(format!("pubkey {raw:?} is not hex"));
        };
        Entry::Accept(ActivatedPp {
            p2p_address: value(event, e, ATTRIBUTE_KEY_NETWORK_ADDRESS),
            p2p_pubkey: hex::encode(pubkey),
            ozone_limit_changes: value(event, e, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
            tx_hash: tx_hash.to_string(),
            initial_deposit: value(event, e, ATTRIBUTE_KEY_INITIAL_DEPOSIT),
        })
    });
    let accepted = pp_list.len();
    finish(&ActivatedPpReq { pp_list }, accepted, filtered)
}

pub fn update_resource_node(events: &[ProcessedEvent], _tx_hash: &str) -> Built {
    let e = EVENT_TYPE_UPDATE_RESOURCE_NODE;
    let (pp_list, filtered) = collect(events, |event| {
        Entry::Accept(UpdatedBeneficiaryPp {
            p2p_address: value(event, e, ATTRIBUTE_KEY_NETWORK_ADDRESS),
            beneficiary_address: value(event, e, ATTRIBUTE_KEY_BENEFICIARY_ADDRESS),
        })
    });
    let accepted = pp_list.len();
    finish(&UpdatedBeneficiaryPpReq { pp_list }, accepted, filtered)
}

fn updated_deposit(event: &ProcessedEvent, e: &str, tx_hash: &str) -> UpdatedDeposit {
    UpdatedDeposit {
        p2p_address: value(event, e, ATTRIBUTE_KEY_NETWORK_ADDRESS),
        ozone_limit_changes: value(event, e, ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES),
        tx_hash: tx_hash.to_string(),
        deposit_delta: value(event, e, ATTRIBUTE_KEY_DEPOSIT_DELTA),
        current_deposit: value(event, e, ATTRIBUTE_KEY_CURRENT_DEPOSIT),
        available_token_before: value(event, e, ATTRIBUTE_KEY_AVAILABLE_TOKEN_BEFORE),
        available_token_after: value(event, e, ATTRIBUTE_KEY_AVAILABLE_TOKEN_AFTER),
    }
}

pub fn update_resource_node_deposit(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let (pp_list, filtered) = collect(events, |event| {
        Entry::Accept(updated_deposit(event, EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT, tx_hash))
    });
    let accepted = pp_list.len();
    finish(&UpdatedDepositPpReq { pp_list }, accepted, filtered)
}

pub fn update_meta_node_deposit(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let (sp_list, filtered) = collect(events, |event| {
        Entry::Accept(updated_deposit(event, EVENT_TYPE_UPDATE_META_NODE_DEPOSIT, tx_hash))
    });
    let accepted = sp_list.len();
    finish(&UpdatedDepositSpReq { sp_list }, accepted, filtered)
}

fn unbonding(event: &ProcessedEvent, e: &str, node_key: &str, tx_hash: &str) -> Unbonding {
    Unbonding {
        p2p_address: value(event, e, node_key),
        unbonding_mature_time: value(event, e, ATTRIBUTE_KEY_UNBONDING_MATURE_TIME),
        tx_hash: tx_hash.to_string(),
        deposit_to_remove: value(event, e, ATTRIBUTE_KEY_DEPOSIT_TO_REMOVE),
    }
}

pub fn unbonding_resource_node(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let (pp_list, filtered) = collect(events, |event| {
        Entry::Accept(unbonding(
            event,
            EVENT_TYPE_UNBONDING_RESOURCE_NODE,
            ATTRIBUTE_KEY_RESOURCE_NODE,
            tx_hash,
        ))
    });
    let accepted = pp_list.len();
    finish(&UnbondingPpReq { pp_list }, accepted, filtered)
}

pub fn unbonding_meta_node(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let (sp_list, filtered) = collect(events, |event| {
        Entry::Accept(unbonding(
            event,
            EVENT_TYPE_UNBONDING_META_NODE,
            ATTRIBUTE_KEY_META_NODE,
            tx_hash,
        ))
    });
    let accepted = sp_list.len();
    finish(&UnbondingSpReq { sp_list }, accepted, filtered)
}

pub fn meta_node_reg_vote(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_META_NODE_REG_VOTE;
    let (sp_list, filtered) = collect(events, |event| {
        let candidate = value(event, e, ATTRIBUTE_KEY_CANDIDATE_NETWORK_ADDRESS);
        if event.get(e, ATTRIBUTE_KEY_CANDIDATE_STATUS) != Some(BOND_STATUS_BONDED) {
            tracing::debug!(candidate = %candidate, "Meta node candidate needs more votes before becoming active");
            return Entry::Filtered;
        }
        Entry::Accept(ActivatedSp {
            p2p_address: candidate,
            tx_hash: tx_hash.to_string(),
        })
    });
    let accepted = sp_list.len();
    finish(&ActivatedSpReq { sp_list }, accepted, filtered)
}

pub fn prepay(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_PREPAY;
    let (wallet_list, filtered) = collect(events, |event| {
        Entry::Accept(Prepaid {
            wallet_address: value(event, e, ATTRIBUTE_KEY_BENEFICIARY),
            purchased_uoz: value(event, e, ATTRIBUTE_KEY_PURCHASED_NOZ),
            tx_hash: tx_hash.to_string(),
        })
    });
    let accepted = wallet_list.len();
    finish(&PrepaidReq { wallet_list }, accepted, filtered)
}

pub fn file_upload(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_FILE_UPLOAD;
    let (upload_list, filtered) = collect(events, |event| {
        Entry::Accept(Uploaded {
            reporter_address: value(event, e, ATTRIBUTE_KEY_REPORTER),
            uploader_address: value(event, e, ATTRIBUTE_KEY_UPLOADER),
            file_hash: value(event, e, ATTRIBUTE_KEY_FILE_HASH),
            tx_hash: tx_hash.to_string(),
        })
    });
    let accepted = upload_list.len();
    finish(&FileUploadedReq { upload_list }, accepted, filtered)
}

pub fn volume_report(events: &[ProcessedEvent], _tx_hash: &str) -> Built {
    let (epochs, filtered) = collect(events, |event| {
        Entry::Accept(value(event, EVENT_TYPE_VOLUME_REPORT, ATTRIBUTE_KEY_EPOCH))
    });
    let accepted = epochs.len();
    finish(&VolumeReportedReq { epochs }, accepted, filtered)
}

pub fn slashing(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_SLASHING;
    let (pp_list, filtered) = collect(events, |event| {
        let raw_suspended = value(event, e, ATTRIBUTE_KEY_NODE_SUSPENDED);
        let Some(suspended) = parse_bool(&raw_suspended) else {
            return Entry::Invalid(format!("suspend {raw_suspended:?} is not a boolean"));
        };
        let raw_amount = value(event, e, ATTRIBUTE_KEY_AMOUNT);
        let Some(slashed_amt) = BigInteger::parse(&raw_amount) else {
            return Entry::Invalid(format!("slashed amount {raw_amount:?} is not an integer"));
        };
        Entry::Accept(SlashedPp {
            p2p_address: value(event, e, ATTRIBUTE_KEY_NETWORK_ADDRESS),
            query_first: false,
            suspended,
            slashed_amt,
        })
    });
    let accepted = pp_list.len();
    finish(
        &SlashedPpReq {
            pp_list,
            tx_hash: tx_hash.to_string(),
        },
        accepted,
        filtered,
    )
}

pub fn update_effective_deposit(events: &[ProcessedEvent], tx_hash: &str) -> Built {
    let e = EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT;
    let (pp_list, filtered) = collect(events, |event| {
        let p2p_address = value(event, e, ATTRIBUTE_KEY_NETWORK_ADDRESS);
        let raw_unsuspended = value(event, e, ATTRIBUTE_KEY_IS_UNSUSPENDED);
        let Some(unsuspended) = parse_bool(&raw_unsuspended) else {
            return Entry::Invalid(format!("is_unsuspended {raw_unsuspended:?} is not a boolean"));
        };
        let raw_deposit = value(event, e, ATTRIBUTE_KEY_EFFECTIVE_DEPOSIT_AFTER);
        let Some(effective_deposit_after) = BigInteger::parse(&raw_deposit) else {
            return Entry::Invalid(format!("effective_deposit_after {raw_deposit:?} is not an integer"));
        };
        tracing::debug!(
            p2p_address = %p2p_address,
            unsuspended,
            effective_deposit_after = %effective_deposit_after.as_str(),
            "Effective deposit updated"
        );
        if !unsuspended {
            return Entry::Filtered;
        }
        Entry::Accept(UpdatedEffectiveDepositPp {
            p2p_address,
            is_unsuspended_during_update: true,
            effective_deposit_after,
        })
    });
    let accepted = pp_list.len();
    finish(
        &UpdatedEffectiveDepositPpReq {
            pp_list,
            tx_hash: tx_hash.to_string(),
        },
        accepted,
        filtered,
    )
}
