//! Synthesizes a top-of-book quote from a P2P offer list.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::P2pConfig;
use crate::domain::{OfferSide, P2pOffer, Pair, Quote, QuoteSource};

/// Returns true if the offer passes the payment-method, amount-range and
/// reputation filters.
pub fn offer_qualifies(offer: &P2pOffer, filter: &P2pConfig) -> bool {
    if offer.price <= Decimal::ZERO || offer.available <= Decimal::ZERO {
        return false;
    }

    if !filter.allowed_payment_methods.is_empty() {
        let accepted = offer.payment_methods.iter().any(|method| {
            filter
                .allowed_payment_methods
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(method))
        });
        if !accepted {
            return false;
        }
    }

    let amount = filter.min_trade_amount;
    if amount > Decimal::ZERO {
        if offer.min_amount > amount {
            return false;
        }
        if offer.max_amount > Decimal::ZERO && offer.max_amount < amount {
            return false;
        }
        if offer.available * offer.price < amount {
            return false;
        }
    }

    match filter.min_reputation {
        Some(min) => offer.reputation.is_some_and(|r| r >= min),
        None => true,
    }
}

/// Builds a quote from the best qualifying offer on each side: the highest
/// price an advertiser buys at becomes the bid, the lowest price an
/// advertiser sells at becomes the ask. None when either side is empty.
///
/// The crossed-book check of ticker adapters does not apply; a P2P bid above
/// the ask is an opportunity in itself.
pub fn synthesize_quote(
    venue: &str,
    pair: &Pair,
    offers: &[P2pOffer],
    filter: &P2pConfig,
    received_at: DateTime<Utc>,
) -> Option<Quote> {
    let qualifying = || offers.iter().filter(|o| offer_qualifies(o, filter));

    let best_bid = qualifying()
        .filter(|o| o.side == OfferSide::Buy)
        .max_by(|a, b| a.price.cmp(&b.price))?;
    let best_ask = qualifying()
        .filter(|o| o.side == OfferSide::Sell)
        .min_by(|a, b| a.price.cmp(&b.price))?;

    Some(Quote {
        venue: venue.to_string(),
        pair: pair.clone(),
        bid_price: best_bid.price,
        bid_size: best_bid.available,
        ask_price: best_ask.price,
        ask_size: best_ask.available,
        timestamp: received_at,
        source: QuoteSource::P2p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn offer(side: OfferSide, price: Decimal) -> P2pOffer {
        P2pOffer {
            advertiser: "trader".into(),
            side,
            price,
            available: dec!(1000),
            min_amount: dec!(100),
            max_amount: dec!(1000000),
            payment_methods: vec!["BANK_TRANSFER".into()],
            reputation: Some(dec!(0.97)),
        }
    }

    fn pair() -> Pair {
        Pair::parse("USDT/ARS").unwrap()
    }

    #[test]
    fn test_best_offer_per_side() {
        let offers = vec![
            offer(OfferSide::Buy, dec!(1030)),
            offer(OfferSide::Buy, dec!(1045)),
            offer(OfferSide::Sell, dec!(1060)),
            offer(OfferSide::Sell, dec!(1052)),
        ];
        let q = synthesize_quote("binance:p2p", &pair(), &offers, &P2pConfig::default(), Utc::now())
            .unwrap();
        assert_eq!(q.bid_price, dec!(1045));
        assert_eq!(q.ask_price, dec!(1052));
        assert_eq!(q.source, QuoteSource::P2p);
    }

    #[test]
    fn test_payment_method_filter_is_case_insensitive() {
        let filter = P2pConfig {
            allowed_payment_methods: vec!["bank_transfer".into()],
            ..P2pConfig::default()
        };
        let mut cash = offer(OfferSide::Buy, dec!(1100));
        cash.payment_methods = vec!["CASH".into()];

        assert!(offer_qualifies(&offer(OfferSide::Buy, dec!(1000)), &filter));
        assert!(!offer_qualifies(&cash, &filter));
    }

    #[test]
    fn test_amount_range_filter() {
        let filter = P2pConfig {
            min_trade_amount: dec!(50000),
            ..P2pConfig::default()
        };

        let mut too_small = offer(OfferSide::Sell, dec!(1000));
        too_small.max_amount = dec!(20000);
        assert!(!offer_qualifies(&too_small, &filter));

        let mut minimum_too_high = offer(OfferSide::Sell, dec!(1000));
        minimum_too_high.min_amount = dec!(60000);
        assert!(!offer_qualifies(&minimum_too_high, &filter));

        let mut unbounded = offer(OfferSide::Sell, dec!(1000));
        unbounded.max_amount = Decimal::ZERO;
        assert!(offer_qualifies(&unbounded, &filter));

        let mut thin = offer(OfferSide::Sell, dec!(1000));
        thin.available = dec!(10);
        assert!(!offer_qualifies(&thin, &filter));
    }

    #[test]
    fn test_reputation_filter() {
        let filter = P2pConfig {
            min_reputation: Some(dec!(0.95)),
            ..P2pConfig::default()
        };
        let mut unknown = offer(OfferSide::Buy, dec!(1000));
        unknown.reputation = None;
        let mut low = offer(OfferSide::Buy, dec!(1000));
        low.reputation = Some(dec!(0.8));

        assert!(offer_qualifies(&offer(OfferSide::Buy, dec!(1000)), &filter));
        assert!(!offer_qualifies(&unknown, &filter));
        assert!(!offer_qualifies(&low, &filter));
    }

    #[test]
    fn test_one_sided_book_yields_nothing() {
        let offers = vec![offer(OfferSide::Buy, dec!(1000))];
        assert!(
            synthesize_quote("x:p2p", &pair(), &offers, &P2pConfig::default(), Utc::now()).is_none()
        );
    }
}
