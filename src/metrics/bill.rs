// Bill collector

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::core::Desc;

use super::{new_desc, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::platform::bill::BillClient;

pub struct BillCollector {
    client: Arc<dyn BillClient>,

    amount: Arc<Desc>,
}

impl BillCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn BillClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("bill");

        Ok(BillCollector {
            client,
            amount: new_desc(
                "bill_amount",
                "Amount billed for the month(unit: JPY)",
                &["member_id"],
            )?,
        })
    }
}

#[async_trait]
impl Collector for BillCollector {
    fn name(&self) -> &'static str {
        "bill"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![&self.amount]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let bill = ctx.fetch_optional("can't get bill", self.client.read()).await;

        if let Some(bill) = bill {
            ctx.emit(&self.amount, bill.amount, vec![bill.member_id]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, single, TestFixture};
    use crate::platform::bill::Bill;
    use crate::platform::ClientResult;

    struct FakeBillClient {
        bill: Option<Bill>,
        fails: bool,
    }

    #[async_trait]
    impl BillClient for FakeBillClient {
        async fn read(&self) -> ClientResult<Option<Bill>> {
            if self.fails {
                return Err(api_error());
            }
            Ok(self.bill.clone())
        }
    }

    #[tokio::test]
    async fn test_amount() {
        let fixture = TestFixture::new();
        let client = FakeBillClient {
            bill: Some(Bill {
                member_id: "M-1".to_string(),
                amount: 1200.0,
                ..Default::default()
            }),
            fails: false,
        };
        let collector = BillCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        let amount = single(&samples, "sakuracloud_bill_amount");
        assert_eq!(amount.value(), 1200.0);
        assert_eq!(amount.label("member_id"), Some("M-1"));
    }

    #[tokio::test]
    async fn test_no_bill_and_failure() {
        let fixture = TestFixture::new();
        let empty = BillCollector::new(
            &fixture.errors,
            Arc::new(FakeBillClient {
                bill: None,
                fails: false,
            }),
        )
        .unwrap();
        assert!(fixture.collect(&empty).await.is_empty());
        assert_eq!(fixture.errors.get("bill"), 0);

        let failing = BillCollector::new(
            &fixture.errors,
            Arc::new(FakeBillClient {
                bill: None,
                fails: true,
            }),
        )
        .unwrap();
        assert!(fixture.collect(&failing).await.is_empty());
        assert_eq!(fixture.errors.get("bill"), 1);
    }
}
