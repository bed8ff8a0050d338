/// APIキーをマスキングしてログ出力用の文字列を生成
///
/// APIキーの最初の4文字と最後の4文字のみを表示し、中間を***でマスキング
///
/// # Examples
/// ```
/// use youtube_live_chat::util::mask_api_key;
///
/// let masked = mask_api_key("AIzaSyABC123def456GHI789");
/// assert_eq!(masked, "AIza***I789");
/// ```
pub fn mask_api_key(api_key: &str) -> String {
    let len = api_key.chars().count();
    if len <= 8 {
        // 短いキーは全体をマスク
        return "***".to_string();
    }

    let prefix: String = api_key.chars().take(4).collect();
    let suffix: String = api_key.chars().skip(len - 4).collect();
    format!("{}***{}", prefix, suffix)
}

/// continuationトークンをログ用に短縮
///
/// トークンは数百文字になるため、先頭のみ表示して長さを添える。
pub fn abbreviate_token(token: &str) -> String {
    const VISIBLE: usize = 12;
    let len = token.chars().count();
    if len <= VISIBLE {
        return token.to_string();
    }
    let head: String = token.chars().take(VISIBLE).collect();
    format!("{}...({} chars)", head, len)
}
