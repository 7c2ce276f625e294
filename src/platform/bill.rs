// Bills

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::common::{deserialize_flag, deserialize_id, deserialize_number};
use super::ClientResult;

/// Monthly bill of the account
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Bill {
    #[serde(rename = "BillID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "MemberID", deserialize_with = "deserialize_id")]
    pub member_id: String,
    /// Billed amount, in JPY
    #[serde(deserialize_with = "deserialize_number")]
    pub amount: f64,
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub paid: bool,
}

#[derive(Deserialize)]
struct BillList {
    #[serde(rename = "Bills", default)]
    bills: Option<Vec<Bill>>,
}

/// Bill with the latest date; undated bills only win over nothing
fn latest(bills: Vec<Bill>) -> Option<Bill> {
    bills.into_iter().max_by_key(|bill| bill.date)
}

#[async_trait]
pub trait BillClient: Send + Sync {
    /// The most recent bill, if the account has any
    async fn read(&self) -> ClientResult<Option<Bill>>;
}

#[async_trait]
impl BillClient for SakuraCloudClient {
    async fn read(&self) -> ClientResult<Option<Bill>> {
        let account_id = self.account_id().await?;
        let list: BillList = self
            .get_json(
                &self.system_url(&format!("bill/by-contract/{}", account_id)),
                None,
            )
            .await?;
        Ok(latest(list.bills.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_bill() {
        let list: BillList = serde_json::from_str(
            r#"{"Bills": [
                {"BillID": 1, "MemberID": "M-1", "Amount": 1000, "Date": "2019-12-01T00:00:00+09:00", "Paid": true},
                {"BillID": 2, "MemberID": "M-1", "Amount": "1200", "Date": "2020-01-01T00:00:00+09:00", "Paid": false},
                {"BillID": 3, "MemberID": "M-1", "Amount": 5, "Date": null}
            ]}"#,
        )
        .unwrap();

        let bill = latest(list.bills.unwrap()).unwrap();
        assert_eq!(bill.id, "2");
        assert_eq!(bill.amount, 1200.0);
        assert!(!bill.paid);

        assert!(latest(Vec::new()).is_none());
    }
}
