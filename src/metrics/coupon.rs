// Coupon collector

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::core::Desc;

use super::{new_desc, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_to_f64, unix_millis};
use crate::platform::coupon::{Coupon, CouponClient};

const COUPON_LABELS: &[&str] = &["id", "member_id", "contract_id"];

pub struct CouponCollector {
    client: Arc<dyn CouponClient>,

    remaining_amount: Arc<Desc>,
    exp_date: Arc<Desc>,
    usable: Arc<Desc>,
}

fn coupon_labels(coupon: &Coupon) -> Vec<String> {
    vec![
        coupon.id.clone(),
        coupon.member_id.clone(),
        coupon.contract_id.clone(),
    ]
}

impl CouponCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn CouponClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("coupon");

        Ok(CouponCollector {
            client,
            remaining_amount: new_desc(
                "coupon_remaining_amount",
                "The remaining amount of coupon(unit: JPY)",
                COUPON_LABELS,
            )?,
            exp_date: new_desc(
                "coupon_exp_date",
                "Coupon expiration date(unit: unixtime-millisecond)",
                COUPON_LABELS,
            )?,
            usable: new_desc(
                "coupon_usable",
                "If 1 the coupon is usable, 0 otherwise",
                COUPON_LABELS,
            )?,
        })
    }
}

#[async_trait]
impl Collector for CouponCollector {
    fn name(&self) -> &'static str {
        "coupon"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![&self.remaining_amount, &self.exp_date, &self.usable]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let coupons = ctx
            .fetch("can't get coupon", self.client.find())
            .await
            .unwrap_or_default();

        for coupon in &coupons {
            let labels = coupon_labels(coupon);
            ctx.emit(&self.remaining_amount, coupon.discount, labels.clone());
            if let Some(until) = &coupon.until_at {
                ctx.emit(&self.exp_date, unix_millis(until), labels.clone());
            }
            ctx.emit(&self.usable, bool_to_f64(coupon.is_usable(ctx.now())), labels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, samples_named, single, TestFixture};
    use crate::platform::ClientResult;
    use chrono::{TimeZone, Utc};

    struct FakeCouponClient {
        result: fn() -> ClientResult<Vec<Coupon>>,
    }

    #[async_trait]
    impl CouponClient for FakeCouponClient {
        async fn find(&self) -> ClientResult<Vec<Coupon>> {
            (self.result)()
        }
    }

    fn coupons() -> ClientResult<Vec<Coupon>> {
        Ok(vec![
            Coupon {
                id: "C-1".to_string(),
                member_id: "M-1".to_string(),
                contract_id: "1".to_string(),
                discount: 20000.0,
                applied_at: Some(Utc.with_ymd_and_hms(2019, 12, 1, 0, 0, 0).unwrap()),
                until_at: Some(Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap()),
            },
            Coupon {
                id: "C-2".to_string(),
                discount: 500.0,
                ..Default::default()
            },
        ])
    }

    #[tokio::test]
    async fn test_coupons() {
        let fixture = TestFixture::new();
        let collector =
            CouponCollector::new(&fixture.errors, Arc::new(FakeCouponClient { result: coupons }))
                .unwrap();

        let samples = fixture.collect(&collector).await;

        let remaining = samples_named(&samples, "sakuracloud_coupon_remaining_amount");
        assert_eq!(remaining.len(), 2);
        let exp = single(&samples, "sakuracloud_coupon_exp_date");
        assert_eq!(exp.label("id"), Some("C-1"));
        assert_eq!(exp.value(), 1580428800000.0);

        let usable = samples_named(&samples, "sakuracloud_coupon_usable");
        let usable_of = |id: &str| {
            usable
                .iter()
                .find(|sample| sample.label("id") == Some(id))
                .map(|sample| sample.value())
        };
        assert_eq!(usable_of("C-1"), Some(1.0));
        // no expiry date means the coupon can't be used
        assert_eq!(usable_of("C-2"), Some(0.0));
    }

    #[tokio::test]
    async fn test_find_failure() {
        let fixture = TestFixture::new();
        let collector = CouponCollector::new(
            &fixture.errors,
            Arc::new(FakeCouponClient {
                result: || Err(api_error()),
            }),
        )
        .unwrap();

        assert!(fixture.collect(&collector).await.is_empty());
        assert_eq!(fixture.errors.get("coupon"), 1);
        assert_eq!(fixture.warning_count(), 1);
    }
}
