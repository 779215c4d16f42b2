//! 참가 PIN 생성

use rand_core::{OsRng, RngCore};

/// PIN 자릿수. 6자리면 활성 세션 수에 비해 공간이 충분히 커서 충돌 재시도가 드뭅니다.
pub const PIN_LENGTH: u32 = 6;

/// `100000`~`999999` 범위의 숫자 PIN을 만듭니다. 앞자리가 0이 되지 않습니다.
pub fn generate_pin() -> String {
    let low = 10u32.pow(PIN_LENGTH - 1);
    let span = 10u32.pow(PIN_LENGTH) - low;
    (low + OsRng.next_u32() % span).to_string()
}
