//! Session 生命周期示例
//!
//! 演示注册、首次认证、token 轮换以及旧 token 被拒绝的过程。
//!
//! 运行: `RUST_LOG=debug cargo run --example session_flow`

use guidauth::audit::TracingAuditLogger;
use guidauth::{
    AuthService, AuthServiceConfig, InMemorySessionStore, TokenManager, TokenManagerConfig,
    UserInput,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== guidauth Session 生命周期示例 ===\n");

    // 优先从环境变量加载，缺失时使用演示密钥
    let config = TokenManagerConfig::from_env().unwrap_or_else(|e| {
        println!("环境变量未配置 ({})，使用演示密钥\n", e);
        TokenManagerConfig::new(
            b"demo-signing-secret-do-not-use!!",
            b"demo-aes-key-32-bytes-long-!!!!!",
        )
    });

    let service = AuthService::with_config(
        TokenManager::new(config)?,
        Arc::new(InMemorySessionStore::new()),
        AuthServiceConfig::new().with_bcrypt_cost(6),
    )?
    .with_audit_logger(Arc::new(TracingAuditLogger));

    let guid = "6f1c2a9e-0d4b-4f7e-9a51-3c2b1d0e8f77";

    println!("1. 注册用户 {}", guid);
    service.register(UserInput::new(guid)).await?;

    println!("2. 首次认证");
    let pair = service.authenticate(guid).await?;
    println!("   access token:  {}...", &pair.access_token[..32]);
    println!("   refresh token: {}...", &pair.refresh_token[..32]);

    println!("3. 再次认证（应被拒绝）");
    if let Err(e) = service.authenticate(guid).await {
        println!("   ✗ {}", e);
    }

    println!("4. 轮换 token");
    let rotated = service.refresh(&pair.refresh_token).await?;
    let claims = service.validate_access_token(&rotated.access_token)?;
    println!("   ✓ 新 access token 属于 {}，exp = {}", claims.guid, claims.exp);

    println!("5. 使用旧 refresh token（应被拒绝）");
    match service.refresh(&pair.refresh_token).await {
        Ok(_) => println!("   ✗ 旧 token 仍然有效"),
        Err(e) => println!("   ✓ {} ({:?})", e, e.kind()),
    }

    println!("\n=== 示例完成 ===");
    Ok(())
}
