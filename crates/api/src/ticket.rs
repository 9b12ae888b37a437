//! Plain-text purchase ticket rendering.
//!
//! Consumes only the order, its snapshot lines and the buying user, so
//! the document always reflects what was billed, never the current
//! catalog.

use common::{Money, Order, OrderLine, User};
use domain::TAX_RATE_PERCENT;

const WIDTH: usize = 46;

/// Renders a printable ticket for a finalized order.
pub fn render(order: &Order, lines: &[OrderLine], customer: &User) -> String {
    let mut doc = String::new();
    let rule = "-".repeat(WIDTH);

    doc.push_str(&"=".repeat(WIDTH));
    doc.push('\n');
    doc.push_str(&center("ChrisShop - Purchase Ticket"));
    doc.push_str(&"=".repeat(WIDTH));
    doc.push('\n');

    doc.push_str(&format!("Order:    #{}\n", order.id));
    doc.push_str(&format!(
        "Date:     {}\n",
        order.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    doc.push_str(&format!("Customer: {}\n", customer.name));
    doc.push_str(&format!("Email:    {}\n", customer.email));
    if let Some(phone) = &customer.phone {
        doc.push_str(&format!("Phone:    {phone}\n"));
    }
    doc.push_str(&format!(
        "Status:   {}\n",
        order.status.as_str().to_uppercase()
    ));
    doc.push_str(&format!(
        "Payment:  {}\n",
        order.payment_method.to_uppercase()
    ));
    doc.push_str(&format!(
        "Delivery: {}\n",
        order.delivery_type.to_uppercase()
    ));
    if !order.delivery_address.is_empty() {
        doc.push_str(&format!("Address:  {}\n", order.delivery_address));
    }

    doc.push_str(&rule);
    doc.push('\n');
    doc.push_str("PRODUCTS\n");
    let mut subtotal = Money::zero();
    for line in lines {
        let line_total = line.line_total();
        subtotal += line_total;
        doc.push_str(&format!(
            "{:<28} x{:<4} {:>10}\n",
            truncate(&line.product_name, 28),
            line.quantity,
            line_total.to_string()
        ));
    }
    doc.push_str(&rule);
    doc.push('\n');

    // The tax line is derived from the billed total so the three
    // amounts always add up, even for orders billed under an older
    // tax rate.
    let tax = order.total - subtotal;
    doc.push_str(&format!("{:>w$}\n", format!("Subtotal: {subtotal}"), w = WIDTH));
    doc.push_str(&format!(
        "{:>w$}\n",
        format!("IVA ({TAX_RATE_PERCENT}%): {tax}"),
        w = WIDTH
    ));
    doc.push_str(&format!(
        "{:>w$}\n",
        format!("TOTAL: {}", order.total),
        w = WIDTH
    ));
    doc.push('\n');

    doc.push_str(&center("Thank you for your purchase!"));
    doc.push_str(&center("ChrisShop - your trusted gamer store"));
    doc
}

fn center(text: &str) -> String {
    format!("{text:^w$}\n", w = WIDTH)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{OrderId, OrderStatus, ProductId, Role, UserId};

    use super::*;

    fn fixture() -> (Order, Vec<OrderLine>, User) {
        let order_id = OrderId::new();
        let user_id = UserId::new();
        let order = Order {
            id: order_id,
            user_id,
            total: Money::from_cents(23200),
            payment_method: "card".to_string(),
            delivery_address: "123 Main St".to_string(),
            delivery_type: "delivery".to_string(),
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        };
        let lines = vec![OrderLine {
            order_id,
            product_id: ProductId::new(),
            product_name: "Mechanical Keyboard".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(10000),
        }];
        let customer = User {
            id: user_id,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            phone: None,
            address: None,
            role: Role::Customer,
            created_at: Utc::now(),
        };
        (order, lines, customer)
    }

    #[test]
    fn totals_section_adds_up() {
        let (order, lines, customer) = fixture();
        let doc = render(&order, &lines, &customer);

        assert!(doc.contains("Subtotal: $200.00"));
        assert!(doc.contains("IVA (16%): $32.00"));
        assert!(doc.contains("TOTAL: $232.00"));
    }

    #[test]
    fn header_carries_order_and_customer_info() {
        let (order, lines, customer) = fixture();
        let doc = render(&order, &lines, &customer);

        assert!(doc.contains(&format!("Order:    #{}", order.id)));
        assert!(doc.contains("Customer: Ana"));
        assert!(doc.contains("Email:    ana@example.com"));
        assert!(doc.contains("Status:   COMPLETED"));
        assert!(doc.contains("Payment:  CARD"));
        assert!(!doc.contains("Phone:"));
    }

    #[test]
    fn lines_show_quantity_and_line_total() {
        let (order, lines, customer) = fixture();
        let doc = render(&order, &lines, &customer);
        assert!(doc.contains("Mechanical Keyboard"));
        assert!(doc.contains("x2"));
        assert!(doc.contains("$200.00"));
    }
}
