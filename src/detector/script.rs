//! 脚本探测
//! 每次探测创建独立的 QuickJS 运行时与上下文：预置 `window = {}`，按文档顺序逐块执行页面脚本
//! （单块失败不影响后续块），再按顺序求值脚本匹配器的 check/version 表达式。
//! 上下文在任何退出路径上随作用域释放。

use std::time::Instant;
use rquickjs::{CatchResultExt, Context, Ctx, Function, Object, Runtime, Value};
use tracing::{debug, trace};

use crate::compiler::ScriptMatcher;
use crate::config::ScriptLimits;
use crate::error::{RsdResult, RsdetectemError};

/// 探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 第一个 check 非 null/undefined 的匹配器
    Matched { matcher: usize, version: Option<String> },
    /// 所有 check 均为 null/undefined
    NoMatch,
    /// 页面脚本执行失败或超出资源限制
    ScriptFailed(String),
}

impl ProbeOutcome {
    pub fn version(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Matched { version, .. } => version.as_deref(),
            _ => None,
        }
    }
}

/// 脚本探测器
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptProbe {
    limits: ScriptLimits,
}

impl ScriptProbe {
    pub fn new(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    /// 执行探测
    ///
    /// 脚本块在同一上下文中依次执行，抛出异常的块被跳过。
    /// 超时、超出长度限制，或有块失败且没有匹配器命中时，结果为 [`ProbeOutcome::ScriptFailed`]；
    /// 只有沙箱本身无法创建时返回错误。
    pub fn probe<S: AsRef<str>>(&self, scripts: &[S], matchers: &[ScriptMatcher]) -> RsdResult<ProbeOutcome> {
        if matchers.is_empty() {
            return Ok(ProbeOutcome::NoMatch);
        }
        let total: usize = scripts.iter().map(|script| script.as_ref().len()).sum();
        if total > self.limits.max_script_bytes {
            return Ok(ProbeOutcome::ScriptFailed(format!(
                "脚本长度{}超过限制{}",
                total, self.limits.max_script_bytes
            )));
        }

        let sandbox = Sandbox::new(&self.limits)?;
        let outcome = sandbox.run(scripts, matchers);
        trace!("脚本探测完成：{:?}", outcome);
        Ok(outcome)
    }

    /// 执行探测，并要求至少一个脚本匹配器给出确定结果
    ///
    /// 未命中属于插件配置错误，返回 [`RsdetectemError::ScriptMatchersUnresolved`]。
    pub fn probe_asserted<S: AsRef<str>>(
        &self,
        plugin: &str,
        scripts: &[S],
        matchers: &[ScriptMatcher],
    ) -> RsdResult<Option<String>> {
        match self.probe(scripts, matchers)? {
            ProbeOutcome::Matched { version, .. } => Ok(version),
            ProbeOutcome::NoMatch => Err(RsdetectemError::ScriptMatchersUnresolved(plugin.to_string())),
            ProbeOutcome::ScriptFailed(reason) => {
                debug!("插件 {} 的脚本执行失败：{}", plugin, reason);
                Err(RsdetectemError::ScriptMatchersUnresolved(plugin.to_string()))
            }
        }
    }
}

/// 单次探测独占的沙箱（字段顺序保证上下文先于运行时释放）
struct Sandbox {
    context: Context,
    _runtime: Runtime,
    deadline: Instant,
}

impl Sandbox {
    fn new(limits: &ScriptLimits) -> RsdResult<Self> {
        let runtime = Runtime::new().map_err(|e| RsdetectemError::SandboxError(e.to_string()))?;
        runtime.set_memory_limit(limits.memory_limit);
        runtime.set_max_stack_size(limits.max_stack_size);

        // 超过截止时间后中断执行（死循环等恶意脚本）
        let deadline = Instant::now() + limits.time_limit;
        runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

        let context = Context::full(&runtime).map_err(|e| RsdetectemError::SandboxError(e.to_string()))?;
        Ok(Self {
            context,
            _runtime: runtime,
            deadline,
        })
    }

    fn run<S: AsRef<str>>(&self, scripts: &[S], matchers: &[ScriptMatcher]) -> ProbeOutcome {
        self.context.with(|ctx| {
            // 1. 预置浏览器全局对象
            let seeded = Object::new(ctx.clone()).and_then(|window| ctx.globals().set("window", window));
            if let Err(e) = seeded {
                return ProbeOutcome::ScriptFailed(format!("window 初始化失败：{}", e));
            }

            // 2. 逐块执行页面脚本，失败的块跳过
            let mut first_failure: Option<String> = None;
            for (index, script) in scripts.iter().enumerate() {
                if let Err(e) = ctx.eval::<Value, _>(script.as_ref()).catch(&ctx) {
                    if Instant::now() >= self.deadline {
                        return ProbeOutcome::ScriptFailed(format!("脚本执行超时：{}", e));
                    }
                    debug!("第{}个脚本块执行失败，已跳过：{}", index, e);
                    first_failure.get_or_insert_with(|| e.to_string());
                }
            }

            // 3. 按顺序求值，第一个命中者胜出
            for (index, matcher) in matchers.iter().enumerate() {
                if !Self::check(&ctx, &matcher.check) {
                    continue;
                }
                let version = Self::version(&ctx, &matcher.version);
                return ProbeOutcome::Matched { matcher: index, version };
            }
            match first_failure {
                Some(reason) => ProbeOutcome::ScriptFailed(reason),
                None => ProbeOutcome::NoMatch,
            }
        })
    }

    /// check 表达式抛出异常视为不存在
    fn check(ctx: &Ctx<'_>, expression: &str) -> bool {
        match ctx.eval::<Value, _>(expression).catch(ctx) {
            Ok(value) => !(value.is_undefined() || value.is_null()),
            Err(e) => {
                trace!("check 表达式求值失败：{}，错误：{}", expression, e);
                false
            }
        }
    }

    fn version(ctx: &Ctx<'_>, expression: &str) -> Option<String> {
        match ctx.eval::<Value, _>(expression).catch(ctx) {
            Ok(value) => Self::value_to_string(ctx, value),
            Err(e) => {
                debug!("version 表达式求值失败：{}，错误：{}", expression, e);
                None
            }
        }
    }

    /// 字符串、数字、布尔值按 JS `String(v)` 转换（如 Infinity、-0 → "0"），其余类型视为未知版本
    fn value_to_string<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Option<String> {
        if !(value.is_string() || value.is_number() || value.is_bool()) {
            return None;
        }
        let to_string: Function = ctx.globals().get("String").ok()?;
        to_string.call::<_, String>((value,)).ok()
    }
}
