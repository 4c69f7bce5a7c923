//! Push envelope codec
//!
//! Every frame written to a gateway connection is a `PushEnvelope` carrying
//! the request kind, the operation id of the originating RPC and the
//! serialized `MsgData`.

use crate::error::Result;
use crate::nova::online_relay::v1::{MsgData, MsgDataList, PushEnvelope};
use bytes::{Bytes, BytesMut};
use prost::Message;

/// Request identifier telling the client this frame is a pushed message
pub const WS_PUSH_MSG: i32 = 2001;

fn encode_message<M: Message>(msg: &M) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(msg.encoded_len());
    msg.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Build the binary push frame for one message
pub fn encode_push(operation_id: &str, msg_data: &MsgData) -> Result<Bytes> {
    let envelope = PushEnvelope {
        req_identifier: WS_PUSH_MSG,
        operation_id: operation_id.to_string(),
        data: encode_message(msg_data)?.to_vec(),
    };
    encode_message(&envelope)
}

/// Build the push frame for a platform-specific batch
///
/// The batch is serialized into `msg_data_list` of a copy of the request's
/// `MsgData`; the request itself is left untouched.
pub fn encode_batch_push(
    operation_id: &str,
    msg_data: &MsgData,
    batch: &MsgDataList,
) -> Result<Bytes> {
    let mut platform_msg = msg_data.clone();
    platform_msg.msg_data_list = encode_message(batch)?.to_vec();
    encode_push(operation_id, &platform_msg)
}

/// Decode the batch list carried by a batch push request
pub fn decode_batch(msg_data: &MsgData) -> Result<MsgDataList> {
    Ok(MsgDataList::decode(msg_data.msg_data_list.as_slice())?)
}

/// Decode a frame produced by [`encode_push`]
pub fn decode_push(frame: &[u8]) -> Result<(PushEnvelope, MsgData)> {
    let envelope = PushEnvelope::decode(frame)?;
    let msg_data = MsgData::decode(envelope.data.as_slice())?;
    Ok((envelope, msg_data))
}
