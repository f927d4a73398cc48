// Static domain-keyword importance table and English stopwords
use ahash::AHashMap;

/// Raw weight of domain keywords; unlisted tokens weigh 1.0
const IMPORTANCE: &[(&str, f32)] = &[
    // Korean
    ("보안", 2.5),
    ("취약점", 2.5),
    ("개인정보", 2.5),
    ("성능", 2.0),
    ("아키텍처", 2.0),
    ("요구사항", 2.0),
    ("위험", 2.0),
    ("리스크", 2.0),
    ("품질", 2.0),
    ("비용", 2.0),
    ("인증", 2.0),
    ("확장성", 2.0),
    ("가용성", 2.0),
    ("장애", 2.0),
    ("예산", 1.8),
    ("일정", 1.8),
    ("테스트", 1.8),
    ("배포", 1.8),
    ("인터페이스", 1.8),
    ("데이터", 1.5),
    ("시스템", 1.5),
    ("사용자", 1.5),
    // English
    ("security", 2.5),
    ("vulnerability", 2.5),
    ("privacy", 2.5),
    ("performance", 2.0),
    ("architecture", 2.0),
    ("requirement", 2.0),
    ("requirements", 2.0),
    ("risk", 2.0),
    ("quality", 2.0),
    ("cost", 2.0),
    ("compliance", 2.0),
    ("scalability", 2.0),
    ("availability", 2.0),
    ("roi", 2.0),
    ("api", 2.0),
    ("budget", 1.8),
    ("schedule", 1.8),
    ("test", 1.8),
    ("testing", 1.8),
    ("deployment", 1.8),
    ("latency", 1.8),
    ("interface", 1.8),
    ("data", 1.5),
    ("system", 1.5),
    ("user", 1.5),
];

pub(super) const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "with",
];

pub(super) fn importance_table() -> AHashMap<&'static str, f32> {
    IMPORTANCE.iter().copied().collect()
}
