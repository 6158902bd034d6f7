//! 检测器核心：驱动 字段提取 → 匹配器查询 → 求值 → 提取函数（以及脚本探测），汇总检测结果
use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::evaluator::{MatcherEvaluator, RawFragment};
use super::result::{Detection, DetectionResult, MissingFieldNotice, PluginFault};
use super::script::{ProbeOutcome, ScriptProbe};
use crate::compiler::{Plugin, PluginCatalog, PluginCompiler};
use crate::config::GlobalConfig;
use crate::error::{RsdResult, RsdetectemError};
use crate::extractor::{Field, FieldExtractor, Transaction};
use crate::rule::{Category, PluginLoader};
use crate::utils::{
    check_presence, extract_name, extract_version, DetectionUpdater, Extracted, Extraction,
    PluginFindings, ScriptFinding,
};

/// 技术检测器
#[derive(Clone)]
pub struct Detector {
    catalog: Arc<PluginCatalog>,
    config: GlobalConfig,
    probe: ScriptProbe,
    pool: Option<Arc<ThreadPool>>,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("plugins", &self.catalog.len())
            .field("config", &self.config)
            .field("parallel", &self.pool.is_some())
            .finish()
    }
}

impl Detector {
    /// 使用已编译的插件目录创建检测器
    pub fn new(catalog: PluginCatalog, config: GlobalConfig) -> RsdResult<Self> {
        let pool = if config.is_parallel() {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .thread_name(|i| format!("rsdetectem-worker-{}", i))
                .build()
                .map_err(|e| RsdetectemError::InvalidInput(format!("线程池创建失败：{}", e)))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self {
            catalog: Arc::new(catalog),
            probe: ScriptProbe::new(config.script_limits),
            config,
            pool,
        })
    }

    /// 默认配置（顺序执行）
    pub fn with_catalog(catalog: PluginCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            config: GlobalConfig::default(),
            probe: ScriptProbe::default(),
            pool: None,
        }
    }

    /// 按配置加载并编译插件后创建检测器
    pub async fn from_config(config: GlobalConfig) -> RsdResult<Self> {
        // 1. 加载插件定义
        let specs = PluginLoader::load(&config).await?;

        // 2. 编译插件目录
        let catalog = PluginCompiler::compile(&specs)?;
        debug!("检测器初始化完成，插件数：{}", catalog.len());

        Self::new(catalog, config)
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn probe(&self) -> &ScriptProbe {
        &self.probe
    }

    /// 核心检测接口：对目录内全部插件独立求值
    ///
    /// 单个插件的故障记录在结果的 faults 中，不会中断其余插件；
    /// 插件需要但事务未填充的字段记录在 missing_fields 中。
    pub fn detect(&self, transaction: &Transaction) -> DetectionResult {
        let plugins: Vec<&Plugin> = self.catalog.iter().map(|plugin| plugin.as_ref()).collect();
        self.detect_plugins(transaction, &plugins)
    }

    /// 只对单个插件检测，结果中最多包含该插件
    pub fn detect_plugin(&self, transaction: &Transaction, plugin: &Plugin) -> DetectionResult {
        self.detect_plugins(transaction, &[plugin])
    }

    /// 按名称对单个插件检测
    pub fn detect_named(&self, transaction: &Transaction, name: &str) -> RsdResult<DetectionResult> {
        let plugin = self
            .catalog
            .get(name)
            .ok_or_else(|| RsdetectemError::UnknownPlugin(name.to_string()))?;
        Ok(self.detect_plugin(transaction, plugin))
    }

    fn detect_plugins(&self, transaction: &Transaction, plugins: &[&Plugin]) -> DetectionResult {
        let scripts =
            FieldExtractor::script_sources(transaction, self.config.script_limits.max_script_bytes);

        let evaluate = |plugin: &&Plugin| {
            let mut missing = Vec::new();
            let outcome = self.evaluate_plugin(transaction, plugin, &scripts, &mut missing);
            (plugin.name.clone(), outcome, missing)
        };
        let outcomes: Vec<(String, RsdResult<Option<Detection>>, Vec<Field>)> = match &self.pool {
            Some(pool) => pool.install(|| plugins.par_iter().map(evaluate).collect()),
            None => plugins.iter().map(evaluate).collect(),
        };

        let mut detections = BTreeMap::new();
        let mut faults = Vec::new();
        let mut missing_fields = Vec::new();
        for (name, outcome, missing) in outcomes {
            missing_fields.extend(missing.into_iter().map(|field| MissingFieldNotice {
                plugin: name.clone(),
                field,
            }));
            match outcome {
                Ok(Some(detection)) => {
                    debug!("检测到技术：{}，版本={}", name, detection);
                    detections.insert(name, detection);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("插件 {} 检测失败：{}", name, e);
                    faults.push(PluginFault { plugin: name, message: e.to_string() });
                }
            }
        }

        let result = DetectionResult::new(detections, faults, missing_fields);
        if self.config.verbose {
            info!(
                "检测完成：命中{}个，故障{}个，缺失字段{}处",
                result.len(),
                result.faults().len(),
                result.missing_fields().len()
            );
        } else {
            debug!("检测完成：命中{}个，故障{}个", result.len(), result.faults().len());
        }
        result
    }

    /// 单字段单类别流水线：字段缺失时返回 MissingField
    pub fn run_pipeline(
        transaction: &Transaction,
        plugin: &Plugin,
        field: Field,
        category: Category,
    ) -> RsdResult<Vec<RawFragment>> {
        let value = FieldExtractor::extract(transaction, field)?;
        Ok(MatcherEvaluator::apply_all(plugin.lookup(field, category), &value))
    }

    /// 单字段单类别流水线，并执行提取函数
    pub fn extract_with(
        transaction: &Transaction,
        plugin: &Plugin,
        field: Field,
        category: Category,
        extraction: Extraction,
    ) -> RsdResult<Extracted> {
        let fragments = Self::run_pipeline(transaction, plugin, field, category)?;
        Ok(extraction.run(&fragments))
    }

    fn evaluate_plugin(
        &self,
        transaction: &Transaction,
        plugin: &Plugin,
        scripts: &[String],
        missing: &mut Vec<Field>,
    ) -> RsdResult<Option<Detection>> {
        let mut findings = PluginFindings::new();

        // 1. 字段匹配：matchers（版本）、modular_matchers（名称）、indicators（存在）
        for category in Category::ALL {
            for field in plugin.fields(category) {
                // 缺失字段上报给调用方，其余字段照常求值
                let value = match FieldExtractor::extract(transaction, field) {
                    Ok(value) => value,
                    Err(RsdetectemError::MissingField(field)) => {
                        debug!("插件 {} 需要的字段缺失：{}", plugin.name, field);
                        if !missing.contains(&field) {
                            missing.push(field);
                        }
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                for (index, matcher) in plugin.lookup(field, category).iter().enumerate() {
                    let fragments = MatcherEvaluator::apply(matcher, index, &value);
                    if fragments.is_empty() {
                        continue;
                    }
                    match category {
                        Category::Matchers => findings.add_versions(field, index, extract_version(&fragments)),
                        Category::ModularMatchers => findings.add_names(field, index, extract_name(&fragments)),
                        Category::Indicators => {
                            if check_presence(&fragments) {
                                findings.add_indicator(field, index);
                            }
                        }
                    }
                }
            }
        }

        // 2. 脚本探测（与字段匹配并行生效）
        if plugin.has_script_matchers() && !scripts.is_empty() {
            match self.probe.probe(scripts, plugin.script_matchers())? {
                ProbeOutcome::Matched { matcher, version } => {
                    findings.set_script(ScriptFinding { matcher, version });
                }
                ProbeOutcome::NoMatch => {}
                ProbeOutcome::ScriptFailed(reason) => {
                    debug!("插件 {} 的脚本匹配器无结果：{}", plugin.name, reason);
                }
            }
        }

        Ok(DetectionUpdater::resolve(findings, self.config.script_precedence))
    }
}
