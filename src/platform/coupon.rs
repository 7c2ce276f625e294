// Coupons

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::common::{deserialize_id, deserialize_number};
use super::ClientResult;

/// Discount coupon granted to the account
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Coupon {
    #[serde(rename = "CouponID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "MemberID", deserialize_with = "deserialize_id")]
    pub member_id: String,
    #[serde(rename = "ContractID", deserialize_with = "deserialize_id")]
    pub contract_id: String,
    /// Remaining amount, in JPY
    #[serde(deserialize_with = "deserialize_number")]
    pub discount: f64,
    pub applied_at: Option<DateTime<Utc>>,
    pub until_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Whether the coupon still discounts anything at `now`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        let started = self.applied_at.map_or(true, |applied| applied <= now);
        let not_expired = self.until_at.map_or(false, |until| now < until);
        started && not_expired && self.discount > 0.0
    }
}

#[derive(Deserialize)]
struct CouponList {
    #[serde(rename = "Coupons", default)]
    coupons: Option<Vec<Coupon>>,
}

#[async_trait]
pub trait CouponClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Coupon>>;
}

#[async_trait]
impl CouponClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Coupon>> {
        let account_id = self.account_id().await?;
        let list: CouponList = self
            .get_json(&self.system_url(&format!("coupon/{}", account_id)), None)
            .await?;
        Ok(list.coupons.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_coupons() {
        let list: CouponList = serde_json::from_str(
            r#"{"Coupons": [{"CouponID": "C-1", "MemberID": "M-1", "ContractID": 1,
                             "Discount": 20000, "AppliedAt": "2019-12-01T00:00:00+09:00",
                             "UntilAt": "2020-02-01T00:00:00+09:00"}]}"#,
        )
        .unwrap();

        let coupon = &list.coupons.unwrap()[0];
        assert_eq!(coupon.id, "C-1");
        assert_eq!(coupon.contract_id, "1");
        assert_eq!(coupon.discount, 20000.0);
    }

    #[test]
    fn test_usable_window() {
        let coupon = Coupon {
            discount: 100.0,
            applied_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            until_at: Some(Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };

        assert!(!coupon.is_usable(Utc.with_ymd_and_hms(2019, 12, 31, 0, 0, 0).unwrap()));
        assert!(coupon.is_usable(Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap()));
        assert!(!coupon.is_usable(Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap()));

        let spent = Coupon {
            discount: 0.0,
            ..coupon
        };
        assert!(!spent.is_usable(Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap()));
    }
}
