//! Booking confirmation emails.
//!
//! Sent after the reservation has committed. Delivery is best-effort by
//! design: a failed send is logged and never rolls the reservation back.

use anyhow::Result;
use base64::Engine as _;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use qrcode::QrCode;

use crate::config::EmailConfig;
use crate::db::{Reservation, Room};

pub struct ReservationMailer {
    config: EmailConfig,
}

impl ReservationMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the confirmation email for a freshly created reservation.
    pub async fn send_confirmation(&self, reservation: &Reservation, room: &Room) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!(
                "Email not configured, skipping confirmation email to {}",
                reservation.email
            );
            return Ok(());
        }

        let subject = format!("Booking confirmed - {} room", room.room_type);
        let qr = qr_data_url(&qr_payload(reservation, room))?;
        let html_body = render_confirmation_html(reservation, room, &qr);
        let text_body = render_confirmation_text(reservation, room);

        self.send_email(&reservation.email, &subject, &html_body, &text_body)
            .await
    }

    /// Send an email with HTML and plain text versions
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from_mailbox = format!("{} <{}>", self.config.from_name, from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(
            to = %to_email,
            subject = %subject,
            "Email sent successfully"
        );

        Ok(())
    }
}

/// Plain-text payload encoded into the QR code shown at check-in.
fn qr_payload(reservation: &Reservation, room: &Room) -> String {
    format!(
        "Reservation #{id}\nGuest: {guest}\nPhone: {phone}\nRoom: {room_type} (#{room_id})\nDates: {start} to {end}",
        id = reservation.id,
        guest = reservation.guest_name,
        phone = reservation.phone,
        room_type = room.room_type,
        room_id = room.id,
        start = reservation.start_date,
        end = reservation.end_date,
    )
}

/// Render the payload as a PNG QR code wrapped in a base64 data URL.
fn qr_data_url(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    let img = code
        .render::<image::Luma<u8>>()
        .min_dimensions(200, 200)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

fn render_confirmation_html(reservation: &Reservation, room: &Room, qr_data_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Booking Confirmed</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
            margin: 0;
            padding: 0;
            background-color: #f5f5f5;
        }}
        .container {{
            max-width: 560px;
            margin: 0 auto;
            padding: 40px 20px;
        }}
        .card {{
            background-color: #ffffff;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0, 0, 0, 0.06);
            overflow: hidden;
        }}
        .header {{
            background: #b02a37;
            color: white;
            padding: 32px 24px;
            text-align: center;
        }}
        .header h1 {{
            margin: 0;
            font-size: 24px;
            font-weight: 600;
        }}
        .content {{
            padding: 32px 24px;
            color: #374151;
            line-height: 1.6;
        }}
        .details {{
            background-color: #f3f4f6;
            border-radius: 6px;
            padding: 16px;
            margin: 20px 0;
        }}
        .details-row {{
            display: flex;
            justify-content: space-between;
            padding: 8px 0;
            border-bottom: 1px solid #e5e7eb;
        }}
        .details-row:last-child {{
            border-bottom: none;
        }}
        .details-label {{
            color: #6b7280;
            font-size: 14px;
        }}
        .details-value {{
            color: #111827;
            font-weight: 500;
        }}
        .qr {{
            text-align: center;
            margin: 24px 0;
        }}
        .note {{
            color: #6b7280;
            font-size: 13px;
            text-align: center;
            margin-top: 24px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <div class="header">
                <h1>Booking Confirmed</h1>
            </div>
            <div class="content">
                <p>Dear <strong>{guest}</strong>, your reservation has been confirmed.</p>

                <div class="details">
                    <div class="details-row">
                        <span class="details-label">Room</span>
                        <span class="details-value">{room_type}</span>
                    </div>
                    <div class="details-row">
                        <span class="details-label">Check-in</span>
                        <span class="details-value">{start}</span>
                    </div>
                    <div class="details-row">
                        <span class="details-label">Check-out</span>
                        <span class="details-value">{end}</span>
                    </div>
                    <div class="details-row">
                        <span class="details-label">Reservation</span>
                        <span class="details-value">#{id}</span>
                    </div>
                </div>

                <div class="qr">
                    <img src="{qr}" alt="Reservation QR code" width="200" height="200"/>
                </div>

                <p class="note">Show this QR code at the front desk. Check-out is at 12:00 PM.</p>
            </div>
        </div>
    </div>
</body>
</html>"#,
        guest = html_escape(&reservation.guest_name),
        room_type = html_escape(&room.room_type),
        start = reservation.start_date,
        end = reservation.end_date,
        id = reservation.id,
        qr = qr_data_url,
    )
}

fn render_confirmation_text(reservation: &Reservation, room: &Room) -> String {
    format!(
        r#"Booking Confirmed

Dear {guest}, your reservation has been confirmed.

Room: {room_type}
Check-in: {start}
Check-out: {end}
Reservation: #{id}

Check-out is at 12:00 PM. See you soon!"#,
        guest = reservation.guest_name,
        room_type = room.room_type,
        start = reservation.start_date,
        end = reservation.end_date,
        id = reservation.id,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixtures() -> (Reservation, Room) {
        let now = "2024-02-01T10:00:00Z".to_string();
        let reservation = Reservation {
            id: 7,
            room_id: 3,
            guest_name: "Elena <Vega>".to_string(),
            phone: "555-0102".to_string(),
            email: "elena@example.com".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            created_at: now.clone(),
        };
        let room = Room {
            id: 3,
            room_type: "Deluxe Double".to_string(),
            nightly_price: 145.0,
            created_at: now.clone(),
            updated_at: now,
        };
        (reservation, room)
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
    }

    #[test]
    fn test_qr_data_url_shape() {
        let url = qr_data_url("Reservation #1").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > 100);
    }

    #[test]
    fn test_render_confirmation_text() {
        let (reservation, room) = fixtures();
        let text = render_confirmation_text(&reservation, &room);
        assert!(text.contains("Elena <Vega>"));
        assert!(text.contains("Deluxe Double"));
        assert!(text.contains("2024-03-01"));
        assert!(text.contains("#7"));
    }

    #[test]
    fn test_render_confirmation_html_escapes_guest() {
        let (reservation, room) = fixtures();
        let html = render_confirmation_html(&reservation, &room, "data:image/png;base64,AAAA");
        assert!(html.contains("Elena &lt;Vega&gt;"));
        assert!(!html.contains("Dear <strong>Elena <Vega>"));
        assert!(html.contains("data:image/png;base64,AAAA"));
        assert!(html.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_qr_payload_contains_details() {
        let (reservation, room) = fixtures();
        let payload = qr_payload(&reservation, &room);
        assert!(payload.contains("Reservation #7"));
        assert!(payload.contains("Deluxe Double"));
        assert!(payload.contains("2024-03-01 to 2024-03-04"));
    }
}
