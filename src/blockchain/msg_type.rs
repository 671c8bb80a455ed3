//! Chain message type URLs.
//!
//! These strings are both the `type_url` of the `Any` a message is packed
//! into and the `message.action` value the chain emits for it.

pub const MSG_TYPE_CREATE_RESOURCE_NODE: &str = "/stratos.register.v1.MsgCreateResourceNode";
pub const MSG_TYPE_UPDATE_RESOURCE_NODE: &str = "/stratos.register.v1.MsgUpdateResourceNode";
pub const MSG_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT: &str =
    "/stratos.register.v1.MsgUpdateResourceNodeDeposit";
pub const MSG_TYPE_REMOVE_RESOURCE_NODE: &str = "/stratos.register.v1.MsgRemoveResourceNode";
pub const MSG_TYPE_CREATE_META_NODE: &str = "/stratos.register.v1.MsgCreateMetaNode";
pub const MSG_TYPE_UPDATE_META_NODE: &str = "/stratos.register.v1.MsgUpdateMetaNode";
pub const MSG_TYPE_UPDATE_META_NODE_DEPOSIT: &str = "/stratos.register.v1.MsgUpdateMetaNodeDeposit";
pub const MSG_TYPE_REMOVE_META_NODE: &str = "/stratos.register.v1.MsgRemoveMetaNode";
pub const MSG_TYPE_META_NODE_REG_VOTE: &str = "/stratos.register.v1.MsgMetaNodeRegistrationVote";
pub const MSG_TYPE_WITHDRAW_META_NODE_REG_DEPOSIT: &str =
    "/stratos.register.v1.MsgWithdrawMetaNodeRegistrationDeposit";
pub const MSG_TYPE_UPDATE_EFFECTIVE_DEPOSIT: &str = "/stratos.register.v1.MsgUpdateEffectiveDeposit";

pub const MSG_TYPE_PREPAY: &str = "/stratos.sds.v1.MsgPrepay";
pub const MSG_TYPE_FILE_UPLOAD: &str = "/stratos.sds.v1.MsgFileUpload";

pub const MSG_TYPE_VOLUME_REPORT: &str = "/stratos.pot.v1.MsgVolumeReport";
pub const MSG_TYPE_WITHDRAW: &str = "/stratos.pot.v1.MsgWithdraw";
pub const MSG_TYPE_SLASHING_RESOURCE_NODE: &str = "/stratos.pot.v1.MsgSlashingResourceNode";

pub const MSG_TYPE_EVM_TX: &str = "/stratos.evm.v1.MsgEthereumTx";

pub const MSG_TYPE_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";

/// Every message type the relay will put into a transaction.
pub const BROADCASTABLE: &[&str] = &[
    MSG_TYPE_CREATE_RESOURCE_NODE,
    MSG_TYPE_UPDATE_RESOURCE_NODE,
    MSG_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT,
    MSG_TYPE_REMOVE_RESOURCE_NODE,
    MSG_TYPE_CREATE_META_NODE,
    MSG_TYPE_UPDATE_META_NODE,
    MSG_TYPE_UPDATE_META_NODE_DEPOSIT,
    MSG_TYPE_REMOVE_META_NODE,
    MSG_TYPE_META_NODE_REG_VOTE,
    MSG_TYPE_WITHDRAW_META_NODE_REG_DEPOSIT,
    MSG_TYPE_UPDATE_EFFECTIVE_DEPOSIT,
    MSG_TYPE_PREPAY,
    MSG_TYPE_FILE_UPLOAD,
    MSG_TYPE_VOLUME_REPORT,
    MSG_TYPE_WITHDRAW,
    MSG_TYPE_SLASHING_RESOURCE_NODE,
    MSG_TYPE_EVM_TX,
    MSG_TYPE_SEND,
];

/// Whether `msg_type` is a message the relay knows how to broadcast.
pub fn is_broadcastable(msg_type: &str) -> bool {
    BROADCASTABLE.contains(&msg_type)
}

/// Short name for logs and metric labels, e.g. "MsgPrepay".
pub fn short_name(msg_type: &str) -> &str {
    msg_type.rsplit('.').next().unwrap_or(msg_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcastable() {
        assert!(is_broadcastable(MSG_TYPE_VOLUME_REPORT));
        assert!(is_broadcastable(MSG_TYPE_SEND));
        assert!(!is_broadcastable("/stratos.register.v1.EventUnBondingResourceNode"));
        assert!(!is_broadcastable("MsgPrepay"));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name(MSG_TYPE_PREPAY), "MsgPrepay");
        assert_eq!(short_name("plain"), "plain");
    }
}
