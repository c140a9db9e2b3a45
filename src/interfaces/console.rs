use crate::domain::amount::Cents;
use crate::domain::payment::{LoginStatus, PaymentStatus};

/// A fixed-price button on the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceItem {
    pub key: &'static str,
    pub label: &'static str,
    pub amount_cents: u32,
}

pub const PRICE_LIST: &[PriceItem] = &[
    PriceItem {
        key: "cola",
        label: "Cola/Bier",
        amount_cents: 150,
    },
    PriceItem {
        key: "wasser",
        label: "Wasser",
        amount_cents: 50,
    },
];

/// Item label sent with amounts typed in by hand.
pub const FREE_AMOUNT_LABEL: &str = "Freier Betrag";

pub fn find_item(key: &str) -> Option<&'static PriceItem> {
    PRICE_LIST
        .iter()
        .find(|item| item.key.eq_ignore_ascii_case(key.trim()))
}

fn euros(cents: u32) -> String {
    match Cents::new(cents) {
        Ok(amount) => amount.to_string(),
        Err(_) => format!("{}.{:02} €", cents / 100, cents % 100),
    }
}

/// One line of text describing the payment phase.
pub fn render_status(status: &PaymentStatus) -> String {
    match status {
        PaymentStatus::Idle => "Ready".to_string(),
        PaymentStatus::CreatingIntent => "Creating payment...".to_string(),
        PaymentStatus::WaitingForTap => "Waiting for card...".to_string(),
        PaymentStatus::Processing => "Processing payment...".to_string(),
        PaymentStatus::FetchingReceipt => "Fetching receipt...".to_string(),
        PaymentStatus::Success {
            amount_cents,
            intent_id,
            receipt_url,
            receipt_error,
        } => {
            let mut line = format!("Paid {} ({intent_id})", euros(*amount_cents));
            match (receipt_url, receipt_error) {
                (Some(url), _) => line.push_str(&format!("\nReceipt: {url}")),
                (None, Some(error)) => line.push_str(&format!("\nReceipt unavailable: {error}")),
                (None, None) => {}
            }
            line
        }
        PaymentStatus::Error(message) => format!("Payment failed: {message}"),
    }
}

pub fn render_login_status(status: &LoginStatus) -> String {
    match status {
        LoginStatus::Idle => "Logged out".to_string(),
        LoginStatus::Loading => "Logging in...".to_string(),
        LoginStatus::Error(message) => format!("Login failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_item() {
        assert_eq!(find_item("Cola").map(|i| i.amount_cents), Some(150));
        assert_eq!(find_item(" wasser ").map(|i| i.label), Some("Wasser"));
        assert!(find_item("mate").is_none());
    }

    #[test]
    fn test_price_list_amounts_are_valid() {
        for item in PRICE_LIST {
            assert!(Cents::new(item.amount_cents).is_ok(), "{}", item.key);
        }
    }

    #[test]
    fn test_render_success_with_receipt() {
        let status = PaymentStatus::Success {
            amount_cents: 150,
            intent_id: "pi_1".to_string(),
            receipt_url: Some("https://r.example/1".to_string()),
            receipt_error: None,
        };
        assert_eq!(
            render_status(&status),
            "Paid 1.50 € (pi_1)\nReceipt: https://r.example/1"
        );
    }

    #[test]
    fn test_render_success_without_receipt() {
        let status = PaymentStatus::Success {
            amount_cents: 50,
            intent_id: "pi_2".to_string(),
            receipt_url: None,
            receipt_error: Some("timeout".to_string()),
        };
        assert_eq!(
            render_status(&status),
            "Paid 0.50 € (pi_2)\nReceipt unavailable: timeout"
        );
    }

    #[test]
    fn test_render_error() {
        assert_eq!(
            render_status(&PaymentStatus::Error("please log in first".to_string())),
            "Payment failed: please log in first"
        );
        assert_eq!(
            render_login_status(&LoginStatus::Error("bad password".to_string())),
            "Login failed: bad password"
        );
    }
}
