//! 动作函数注册与分发
//!
//! 通过 `ActionHandler` trait 抽象规则中 before/after 引用的函数，
//! `FunctionRegistry` 按名称保存并调用它们。

use crate::error::{Result, RuleError};
use crate::models::Action;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 可被规则调用的函数
///
/// `context` 是 before 动作的返回值（调用 before 本身时为 `None`），
/// `params` 是规则里 `Action.params` 的原样拷贝。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, context: Option<Value>, params: Option<Value>) -> anyhow::Result<Value>;
}

/// 闭包适配器，见 [`FunctionRegistry::register_fn`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Option<Value>, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, context: Option<Value>, params: Option<Value>) -> anyhow::Result<Value> {
        (self.0)(context, params).await
    }
}

/// 超时包装
///
/// 引擎本身不设超时，需要时由调用方包装单个函数。
pub struct TimeoutHandler<H> {
    inner: H,
    timeout: Duration,
}

impl<H: ActionHandler> TimeoutHandler<H> {
    pub fn new(inner: H, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<H: ActionHandler> ActionHandler for TimeoutHandler<H> {
    async fn call(&self, context: Option<Value>, params: Option<Value>) -> anyhow::Result<Value> {
        tokio::time::timeout(self.timeout, self.inner.call(context, params))
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {} ms", self.timeout.as_millis()))?
    }
}

#[async_trait]
impl ActionHandler for Arc<dyn ActionHandler> {
    async fn call(&self, context: Option<Value>, params: Option<Value>) -> anyhow::Result<Value> {
        self.as_ref().call(context, params).await
    }
}

/// 函数注册表
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ActionHandler>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册函数，同名函数会被覆盖
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> &mut Self {
        let name = name.into();
        if self.functions.insert(name.clone(), Arc::new(handler)).is_some() {
            warn!(func = %name, "Function re-registered, previous handler replaced");
        }
        self
    }

    /// 注册异步闭包
    ///
    /// ```ignore
    /// registry.register_fn("getOrder", |_ctx, params| async move {
    ///     Ok(json!({ "id": params.and_then(|p| p.get("orderId").cloned()) }))
    /// });
    /// ```
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Option<Value>, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(name, FnHandler(f))
    }

    /// 为所有已注册函数加上统一超时
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let functions = self
            .functions
            .into_iter()
            .map(|(name, handler)| {
                let wrapped: Arc<dyn ActionHandler> =
                    Arc::new(TimeoutHandler::new(handler, timeout));
                (name, wrapped)
            })
            .collect();
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// 已注册的函数名（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// 调用动作
    ///
    /// 函数未注册时返回 `FunctionNotFound`；函数自身的错误包装为
    /// `ActionFailed` 原样向上传递。
    #[instrument(skip(self, action, context), fields(func = %action.func))]
    pub async fn call(&self, action: &Action, context: Option<&Value>) -> Result<Value> {
        let handler = self
            .functions
            .get(&action.func)
            .ok_or_else(|| RuleError::FunctionNotFound(action.func.clone()))?;

        debug!(has_context = context.is_some(), "Invoking action");

        handler
            .call(context.cloned(), action.params.clone())
            .await
            .map_err(|source| RuleError::ActionFailed {
                func: action.func.clone(),
                source,
            })
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
