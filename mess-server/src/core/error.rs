use thiserror::Error;

/// 启动 / 运行期错误
///
/// 请求级错误使用 [`crate::AppError`]；这里只覆盖无法映射到 HTTP 响应的失败
/// (初始化、端口绑定、serve 退出)。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Server 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
