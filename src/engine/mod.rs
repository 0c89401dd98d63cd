// ==========================================
// 集装箱配载引擎 - 引擎层
// ==========================================
// 职责: 容量计算、箱型建议、配载分配、容量校验、生命周期规则
// 红线: Engine 不拼 SQL, 不落库; 所有拒绝必须给出原因
// ==========================================

pub mod allocator;
pub mod box_type_advisor;
pub mod capacity_model;
pub mod lifecycle;
pub mod validator;

// 重导出核心引擎
pub use allocator::{
    AllocationPlan, ContainerAllocator, ContainerSuggestion, LoadingEfficiency, PlannedContainer,
    SuggestionSet,
};
pub use box_type_advisor::{BoxTypeAdvisor, BoxTypeAnalysis, BoxTypeComparison};
pub use capacity_model::{CapacityInputError, FreightClass, FreightClassification};
pub use validator::{
    BalanceReport, CapacityValidator, ComprehensiveReport, FitCheck, Issue, IssueType, LoadItem,
    OptimizationReport, Suggestion, SuggestionType, ValidationReport,
};
