//! Mobile-money payment initiation.
//!
//! The server sends an STK push to the customer's phone; completion is
//! confirmed out of band, so the client only learns that the push was
//! accepted.

use till_core::{ApiMessage, MpesaPaymentRequest};

use super::ApiClient;
use crate::error::ClientResult;

impl ApiClient {
    pub async fn mpesa_payment(&self, request: &MpesaPaymentRequest) -> ClientResult<ApiMessage> {
        request.validate()?;
        let ack: Option<ApiMessage> = self.post("/payments/mpesa", request).await?;
        Ok(ack.unwrap_or_default())
    }
}
