//! Built-in curation tables: trusted outlets, tiers, criteria and the
//! tracked company roster.

use std::collections::BTreeMap;

use crate::policy::{CompanyCategory, PressOutlet, PressTier};

pub const SELECTION_CAP: usize = 3;

pub const TRIAGE_SYSTEM_PROMPT: &str = "당신은 회계법인의 뉴스 분석 전문가입니다. 뉴스의 중요성을 판단하여 제외/보류/유지로 분류하는 작업을 수행합니다. 특히 회계법인의 관점에서 중요하지 않은 뉴스(예: 단순 홍보, CSR 활동, 이벤트 등)를 식별하고, 회계 감리나 재무 관련 이슈는 최대한 유지하도록 합니다.";

pub const GROUPING_SYSTEM_PROMPT: &str = "당신은 뉴스 분석 전문가입니다. 유사한 뉴스를 그룹화하고 대표성을 갖춘 기사를 선택하는 작업을 수행합니다. 같은 사안에 대해 숫자, 기업, 계열사, 맥락, 주요 키워드 등이 유사하면 중복으로 판단합니다. 언론사의 신뢰도와 기사의 상세도를 고려하여 대표 기사를 선정합니다.";

pub const IMPORTANCE_SYSTEM_PROMPT: &str = "당신은 회계법인의 전문 애널리스트입니다. 뉴스의 중요도를 평가하고 최종 선정하는 작업을 수행합니다. 특히 회계 감리, 재무제표, 경영권 변동, 주요 계약, 법적 분쟁 등 회계법인의 관점에서 중요한 이슈를 식별하고, 그 중요도를 '상' 또는 '중'으로 평가합니다. 또한 각 뉴스의 핵심 키워드와 관련 계열사를 식별하여 보고합니다.";

pub const EXCLUSION_CRITERIA: &str = "다음 조건 중 하나라도 해당하는 뉴스는 제외하세요:

1. 경기 관련 내용
   - 스포츠단 관련 내용
   - 키워드: 야구단, 축구단, 구단, KBO, 프로야구, 감독, 선수

2. 신제품 홍보, 사회공헌, ESG, 기부 등
   - 키워드: 출시, 기부, 환경 캠페인, 브랜드 홍보, 사회공헌, 나눔, 캠페인 진행, 소비자 반응

3. 단순 시스템 장애, 버그, 서비스 오류
   - 키워드: 일시 중단, 접속 오류, 서비스 오류, 버그, 점검 중, 업데이트 실패

4. 기술 성능, 품질, 테스트 관련 보도
   - 키워드: 우수성 입증, 기술력 인정, 성능 비교, 품질 테스트, 기술 성과

5. 목표가 관련 보도
   - 키워드: 목표가, 목표주가 달성, 목표주가 도달, 목표주가 향상, 목표가↑, 목표가↓";

pub const DUPLICATE_HANDLING: &str = "중복 뉴스가 존재할 경우 다음 우선순위로 1개만 선택하십시오:
1. 언론사 우선순위 (높은 순위부터)
   - 1순위: 경제 전문지 (한국경제, 매일경제, 조선비즈, 파이낸셜뉴스)
   - 2순위: 종합 일간지 (조선일보, 중앙일보, 동아일보)
   - 3순위: 통신사 (연합뉴스, 뉴스핌, 뉴시스)
   - 4순위: 기타 언론사

2. 발행 시간 (같은 언론사 내에서)
   - 최신 기사 우선
   - 정확한 시간 정보가 없는 경우, 날짜만 비교

3. 기사 내용의 완성도
   - 더 자세한 정보를 포함한 기사 우선
   - 주요 인용문이나 전문가 의견이 포함된 기사 우선
   - 단순 보도보다 분석적 내용이 포함된 기사 우선

4. 제목의 명확성
   - 더 구체적이고 명확한 제목의 기사 우선
   - 핵심 키워드가 포함된 제목 우선";

pub const SELECTION_CRITERIA: &str = "다음 기준에 해당하는 뉴스가 있다면 반드시 선택해야 합니다:

1. 재무/실적 관련 정보 (최우선 순위)
   - 매출, 영업이익, 순이익 등 실적 발표
   - 재무제표 관련 정보
   - 배당 정책 변경

2. 회계/감사 관련 정보 (최우선 순위)
   - 회계처리 방식 변경
   - 감사의견 관련 내용
   - 내부회계관리제도
   - 회계 감리 결과

3. 구조적 기업가치 변동 정보 (높은 우선순위)
   - 신규사업/투자/계약에 대한 내용
   - 대외 전략(정부 정책, 글로벌 파트너, 지정학 리스크 등)
   - 기업의 새로운 사업전략 및 방향성, 신사업 등
   - 기업의 전략 방향성에 영향을 미칠 수 있는 정보
   - 기존 수입모델/사업구조/고객구조 변화
   - 공급망/수요망 등 valuechain 관련 내용 (예: 대형 생산지 이전, 주력 사업군 정리 등)

4. 기업구조 변경 정보 (높은 우선순위)
   - 인수합병(M&A)
   - 자회사 설립/매각
   - 지분 변동
   - 조직 개편";

pub fn trusted_press() -> Vec<PressOutlet> {
    vec![
        PressOutlet::new("조선일보", &["조선일보", "chosun", "chosun.com"]),
        PressOutlet::new("중앙일보", &["중앙일보", "joongang", "joongang.co.kr", "joins.com"]),
        PressOutlet::new("동아일보", &["동아일보", "donga", "donga.com"]),
        PressOutlet::new("조선비즈", &["조선비즈", "chosunbiz", "biz.chosun.com"]),
        PressOutlet::new("매거진한경", &["매거진한경", "magazine.hankyung", "magazine.hankyung.com"]),
        PressOutlet::new("한국경제", &["한국경제", "hankyung", "hankyung.com", "한경닷컴"]),
        PressOutlet::new("매일경제", &["매일경제", "매경", "mk.co.kr"]),
        PressOutlet::new("연합뉴스", &["연합뉴스", "yna", "yna.co.kr"]),
        PressOutlet::new("파이낸셜뉴스", &["파이낸셜뉴스", "fnnews", "fnnews.com"]),
        PressOutlet::new("데일리팜", &["데일리팜", "dailypharm", "dailypharm.com"]),
        PressOutlet::new("IT조선", &["it조선", "it.chosun.com", "itchosun"]),
        PressOutlet::new("머니투데이", &["머니투데이", "mt.co.kr"]),
        PressOutlet::new("비즈니스포스트", &["비즈니스포스트", "businesspost", "businesspost.co.kr"]),
        PressOutlet::new("이데일리", &["이데일리", "edaily", "edaily.co.kr"]),
        PressOutlet::new("아시아경제", &["아시아경제", "asiae", "asiae.co.kr"]),
        PressOutlet::new("뉴스핌", &["뉴스핌", "newspim", "newspim.com"]),
        PressOutlet::new("뉴시스", &["뉴시스", "newsis", "newsis.com"]),
        PressOutlet::new("헤럴드경제", &["헤럴드경제", "herald", "heraldcorp", "heraldcorp.com"]),
        PressOutlet::new("더벨", &["더벨", "thebell", "thebell.co.kr"]),
        PressOutlet::new("SBS", &["SBS", "SBS Biz", "SBSBiz", "SBS뉴스", "sbs.co.kr"]),
        PressOutlet::new("MBC", &["MBC", "mbc.co.kr", "MBC뉴스", "mbcnews"]),
        PressOutlet::new("KBS", &["KBS", "kbs.co.kr", "KBS뉴스", "kbsnews"]),
        PressOutlet::new("딜사이트", &["딜사이트", "DealSite", "dealsite.co.kr"]),
        PressOutlet::new("이코노믹리뷰", &["이코노믹리뷰", "econvill.com", "econvill"]),
        PressOutlet::new(
            "딜사이트경제TV",
            &["딜사이트경제TV", "DealSite경제TV", "dealsite.economictv", "dealsite.economictv.co.kr"],
        ),
        PressOutlet::new(
            "한국금융경제신문",
            &["한국금융경제신문", "kfn.economictv", "kfn.economictv.co.kr"],
        ),
        PressOutlet::new("조세일보", &["조세일보", "joseilbo.com"]),
    ]
}

pub fn additional_press() -> Vec<PressOutlet> {
    vec![
        PressOutlet::new("철강금속신문", &["철강금속신문", "snmnews", "snmnews.com"]),
        PressOutlet::new("에너지신문", &["에너지신문", "energy-news", "energy-news.co.kr"]),
        PressOutlet::new("이코노믹데일리", &["이코노믹데일리", "economidaily", "economidaily.com"]),
    ]
}

pub fn press_tiers() -> Vec<PressTier> {
    let tier = |name: &str, outlets: &[&str]| PressTier {
        name: name.to_string(),
        outlets: outlets.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        tier("economic", &["한국경제", "매일경제", "조선비즈", "파이낸셜뉴스"]),
        tier("general", &["조선일보", "중앙일보", "동아일보"]),
        tier("wire", &["연합뉴스", "뉴스핌", "뉴시스"]),
    ]
}

pub fn categories() -> Vec<CompanyCategory> {
    let category = |name: &str, companies: &[&str]| CompanyCategory {
        name: name.to_string(),
        active: true,
        companies: companies.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        category("Anchor", &["삼성", "SK", "현대차", "LG", "롯데", "포스코", "한화"]),
        category("Growth", &["CJ", "NH", "HD현대", "신한금융", "우리금융"]),
        category("Whitespace", &["신세계", "KDB금융", "GS", "LS"]),
    ]
}

pub fn search_terms() -> BTreeMap<String, Vec<String>> {
    let entries: &[(&str, &[&str])] = &[
        ("포스코", &["포스코", "포스코그룹", "포스코인터내셔널", "포스코DX"]),
        ("삼성", &["삼성", "삼성전자", "삼성그룹", "삼성바이오로직스", "삼성SDI"]),
        ("SK", &["SK", "SK하이닉스", "SK이노베이션", "SK텔레콤", "SK그룹", "SK이노"]),
        ("현대차", &["현대차", "현대자동차", "현대모비스", "현대차그룹", "기아"]),
        ("LG", &["LG", "LG전자", "LG화학", "LG디스플레이", "LG그룹"]),
        ("롯데", &["롯데", "롯데그룹", "롯데케미칼", "롯데쇼핑", "롯데제과", "신동빈"]),
        ("한화", &["한화", "한화그룹", "한화에어로스페이스", "한화솔루션", "한화생명"]),
        ("CJ", &["CJ", "CJ그룹", "CJ제일제당", "CJ대한통운", "CJ ENM", "CJ올리브영"]),
        ("NH", &["NH", "NH투자증권", "농협은행", "농협금융지주", "NH농협"]),
        ("HD현대", &["HD현대", "HD한국조선해양", "HD현대중공업", "HD현대오일뱅크", "HD현대일렉트릭"]),
        ("신한금융", &["신한금융", "신한은행", "신한투자증권", "신한카드", "신한금융지주"]),
        ("우리금융", &["우리금융", "우리은행", "우리투자증권", "우리금융지주", "우리금융캐피탈"]),
        ("신세계", &["신세계", "이마트", "신세계푸드", "신세계인터내셔날", "SSG"]),
        ("KDB금융", &["KDB", "한국산업은행", "산은캐피탈", "KDB생명보험", "HMM"]),
        ("GS", &["GS", "GS건설", "GS칼텍스", "GS리테일", "GS에너지"]),
        ("LS", &["LS", "LS일렉트릭", "LS전선", "LS M&M", "LS메탈"]),
    ];
    entries
        .iter()
        .map(|(company, terms)| {
            (
                company.to_string(),
                terms.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

pub fn exclusion_addenda() -> BTreeMap<String, String> {
    let mut addenda = BTreeMap::new();
    addenda.insert(
        "현대차".to_string(),
        "\n\n6. 현대차그룹 특화 제외 기준 (추가):\n   1) 노사 갈등 및 임단협 관련 보도\n   - 키워드: 현대차證"
            .to_string(),
    );
    addenda.insert(
        "롯데".to_string(),
        "\n\n6. 롯데그룹 특화 제외 기준 (추가):\n   - 키워드: 롯데카드, 롯데손보, 롯데손해보험".to_string(),
    );
    addenda
}

const SELECTION_ADDENDUM_HEADER: &str =
    "해당 키워드가 포함되어 있을 경우에도 위 기준 3 또는 4에 해당하므로 반드시 선택합니다:";

pub fn selection_addenda() -> BTreeMap<String, String> {
    let entries: &[(&str, &str, &[&str])] = &[
        (
            "CJ",
            "CJ그룹(CJ제일제당, CJ대한통운, CJ ENM 등)",
            &[
                "콘텐츠 전략: 콘텐츠 IP, OTT, 제작비, 콘텐츠 투자, 스튜디오드래곤, CJ ENM 전략",
                "유통/물류 구조: 풀필먼트, 물류센터, 냉장물류, SCM, 글로벌 유통망, CJ대한통운",
                "사업구조 변화: 인적분할, 물적분할, 계열 분할, 자회사 설립, 사업부 분리, 지분 매각",
            ],
        ),
        (
            "NH",
            "NH농협금융지주그룹(NH투자증권, NH농협은행 등)",
            &[
                "금융 디지털화: 스마트팜 금융, 디지털전환, 플랫폼 전략, 모바일뱅킹, 금융앱, AI대출",
                "농협 특수성: 조합원, 상호금융, 농민 금융, 지역 농협, 농업 지원 정책",
                "계열 전략: NH투자증권, NH-Amundi, NH캐피탈, 계열사 구조, 지주 전략",
            ],
        ),
        (
            "우리금융",
            "우리금융지주 (우리은행, 우리카드, 우리금융캐피탈 등)",
            &[
                "지배구조 이슈: 예금보험공사, 공적자금, 지분 매각, 민영화, 최대주주, 지분 구조 변화",
                "경영진 인사: 대표이사, 행장, 회장단, 연임, 경영진 교체, 이사회 구성",
                "PF/리스크 이슈: PF대출, 부동산 리스크, 부실채권, 충당금, 건전성, BIS비율",
            ],
        ),
        (
            "HD현대",
            "HD현대 (HD한국조선해양, HD현대중공업, HD현대오일뱅크 등)",
            &[
                "무인화/자동화 전략: 스마트조선소, 자동용접, 무인운반, 디지털 조선, AI 기반 설계, 로봇공정",
                "친환경/에너지 전환: 암모니아 추진선, 수소엔진, 친환경선박, 탄소중립, 그린수소, 해상풍력, 에너지저장장치(ESS)",
                "글로벌 인프라 전략: 중동 플랜트, 오만 수주, 사우디 프로젝트, 글로벌 조선 수주, 선박 계약",
            ],
        ),
        (
            "신한금융",
            "신한금융지주 (신한은행, 신한카드, 신한투자증권 등)",
            &[
                "포트폴리오 재편: 비은행 강화, 카드·증권 통합, 신사업 진출, 핀테크 투자, 디지털 플랫폼화, 디지털 전환 전략",
                "경영 인사 및 지배구조: 차기 회장, 행장 인선, 경영진 재편, 지주사 체제 개편, CEO 리스크, 내부통제 강화",
                "리스크 대응: 금리 민감도, 충당금 적립, 부동산 익스포저",
            ],
        ),
        (
            "신세계",
            "신세계그룹",
            &[
                "리테일 전략: 복합몰 전략, 스타필드, 프리미엄 아울렛, 이마트 구조조정, 백화점 실적, 온라인 통합몰",
                "사업구조 변화: 신세계인터내셔날, 지분 매각, 신사업 확장",
            ],
        ),
        (
            "KDB금융",
            "KDB금융지주",
            &[
                "정책금융 역할: 정책금융, 구조조정 주도, 산업은행, 매각 자문, 국책은행 역할",
                "기업 구조개편: 출자전환, PF 위험 평가, 기업 구조개편, 인수금융, 구조개편 지원",
            ],
        ),
        (
            "GS",
            "GS그룹",
            &[
                "에너지 전환: GS에너지, RE100, LNG 인프라, 그린수소, 탄소 포집",
                "리테일 혁신: GS리테일, 편의점 수익, 통합 물류",
                "그룹 구조 개편: 계열사 재편, 미래 성장 포트폴리오",
            ],
        ),
        (
            "LS",
            "LS그룹",
            &[
                "전력 인프라: 전선사업, 배터리 소재, 전력 인프라, ESS, LS일렉트릭 전략",
                "친환경 소재: 동소재, 전기차 부품, 탄소저감 소재",
                "사업구조 재편: LS엠트론, 계열 분할, 신성장 동력",
            ],
        ),
    ];

    entries
        .iter()
        .map(|(company, group, lines)| {
            let mut block = format!(
                "\n\n5. {} 특화 기준 (위 기준 3, 4에 추가 해당)\n   {}",
                group, SELECTION_ADDENDUM_HEADER
            );
            for line in lines.iter() {
                block.push_str("\n   - ");
                block.push_str(line);
            }
            (company.to_string(), block)
        })
        .collect()
}
