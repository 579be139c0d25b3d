//! Notification message formatting.
//!
//! The markdown layout is consumed by people and by downstream keyword
//! filters in the DingTalk groups, so it is reproduced exactly.

use chrono::{DateTime, Local};

use crate::types::NatEntry;

/// Source tag shown in every message.
pub const SOURCE_TAG: &str = "H3c-MSR2600";

/// Link appended to every message.
pub const REFERENCE_LINK: &str = "[查看内外网映射关系表](https://alidocs.dingtalk.com/i/nodes/0eMKjyp813EOMaXPH9EkeOZwVxAZB1Gv?utm_scene=team_space)";

/// Timestamp layout for message fields.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Mapping will expire within the reminder window.
    ExpiryReminder,
    /// Mapping was deleted from the router.
    DeletionConfirmation,
}

impl MessageKind {
    pub fn title(&self) -> &'static str {
        match self {
            MessageKind::ExpiryReminder => "[通知] 端口映射即将过期",
            MessageKind::DeletionConfirmation => "[通知] 端口映射条目删除",
        }
    }

    fn event_label(&self) -> &'static str {
        match self {
            MessageKind::ExpiryReminder => "通知时间",
            MessageKind::DeletionConfirmation => "删除时间",
        }
    }
}

/// A fully described notification, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: MessageKind,
    pub global_address: String,
    pub local_address: String,
    pub protocol: String,
    pub description: String,
    pub expiry: DateTime<Local>,
    /// When the reminder was sent or the deletion happened.
    pub event_time: DateTime<Local>,
}

impl Notification {
    /// Builds a notification for an entry that carries an expiry.
    ///
    /// Returns `None` for entries without a lifecycle policy.
    pub fn for_entry(
        kind: MessageKind,
        entry: &NatEntry,
        description: String,
        event_time: DateTime<Local>,
    ) -> Option<Self> {
        Some(Self {
            kind,
            global_address: entry.global_address(),
            local_address: entry.local_address(),
            protocol: entry.protocol.to_string(),
            description,
            expiry: entry.expiry?,
            event_time,
        })
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Renders the markdown body.
    pub fn render(&self) -> String {
        format!(
            "## {title}\n\n\
             **消息来源：** {source}\n\n\
             **外网地址端口：** {global}\n\n\
             **内网地址端口：** {local}\n\n\
             **协议类型：** {protocol}\n\n\
             **描述：** {description}\n\n\
             **到期时间：** {expiry}\n\n\
             **{label}：** {event}\n\n\
             ---\n\n\
             {link}",
            title = self.kind.title(),
            source = SOURCE_TAG,
            global = self.global_address,
            local = self.local_address,
            protocol = self.protocol,
            description = self.description,
            expiry = self.expiry.format(TIME_FORMAT),
            label = self.kind.event_label(),
            event = self.event_time.format(TIME_FORMAT),
            link = REFERENCE_LINK,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endpoint, Protocol};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn entry() -> NatEntry {
        NatEntry {
            protocol: Protocol::Tcp,
            global: Some(Endpoint::new(Ipv4Addr::new(203, 0, 113, 10), 8080)),
            local: Some(Endpoint::new(Ipv4Addr::new(192, 168, 1, 112), 80)),
            description: "web vp=250615".to_string(),
            expiry: Some(Local.with_ymd_and_hms(2025, 6, 15, 21, 30, 0).unwrap()),
            ..NatEntry::new("GigabitEthernet0/0")
        }
    }

    #[test]
    fn test_render_expiry_reminder() {
        let sent = Local.with_ymd_and_hms(2025, 6, 12, 9, 0, 5).unwrap();
        let message =
            Notification::for_entry(MessageKind::ExpiryReminder, &entry(), "官网".to_string(), sent)
                .unwrap();

        let expected = "## [通知] 端口映射即将过期

**消息来源：** H3c-MSR2600

**外网地址端口：** 203.0.113.10:8080

**内网地址端口：** 192.168.1.112:80

**协议类型：** TCP

**描述：** 官网

**到期时间：** 2025-06-15 21:30:00

**通知时间：** 2025-06-12 09:00:05

---

[查看内外网映射关系表](https://alidocs.dingtalk.com/i/nodes/0eMKjyp813EOMaXPH9EkeOZwVxAZB1Gv?utm_scene=team_space)";
        assert_eq!(message.render(), expected);
        assert_eq!(message.title(), "[通知] 端口映射即将过期");
    }

    #[test]
    fn test_render_deletion_differs_in_title_and_label() {
        let at = Local.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        let reminder =
            Notification::for_entry(MessageKind::ExpiryReminder, &entry(), "x".into(), at).unwrap();
        let deletion =
            Notification::for_entry(MessageKind::DeletionConfirmation, &entry(), "x".into(), at)
                .unwrap();

        let body = deletion.render();
        assert!(body.starts_with("## [通知] 端口映射条目删除\n"));
        assert!(body.contains("**删除时间：** 2025-06-16 00:00:00"));
        assert!(!body.contains("通知时间"));

        // Everything but the heading and the event line is shared.
        let rest = |s: &str| {
            s.lines()
                .skip(1)
                .filter(|l| !l.contains("时间：** 2025-06-16"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(rest(&reminder.render()), rest(&body));
    }

    #[test]
    fn test_no_expiry_no_message() {
        let at = Local.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        let plain = NatEntry::new("GigabitEthernet0/0");
        assert_eq!(
            Notification::for_entry(MessageKind::ExpiryReminder, &plain, String::new(), at),
            None
        );
    }
}
