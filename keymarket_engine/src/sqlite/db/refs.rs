use sqlx::SqliteConnection;

use crate::{helpers::format_reference, traits::MarketGatewayError};

/// Draws the next transfer reference from the sequence. Run inside the transaction that
/// inserts the payment, so an aborted insert returns the sequence value unused — gaps are
/// harmless, reuse is not.
pub async fn next_reference(conn: &mut SqliteConnection) -> Result<String, MarketGatewayError> {
    let (seq,): (i64,) =
        sqlx::query_as("UPDATE transfer_ref_seq SET next_value = next_value + 1 WHERE id = 1 RETURNING next_value - 1")
            .fetch_one(conn)
            .await?;
    #[allow(clippy::cast_sign_loss)]
    let seq = seq as u64;
    Ok(format_reference(seq))
}
