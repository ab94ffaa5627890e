//! panic 负载转换

use std::any::Any;

/// 取出 panic 负载中的消息
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload = std::panic::catch_unwind(|| panic!("静态消息")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "静态消息");

        let payload = std::panic::catch_unwind(|| panic!("格式化 {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "格式化 42");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
