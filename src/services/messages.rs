// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canned condition messages keyed by composite score key.
//!
//! Keys are `{activity level}{activity trend}{sleep level}{sleep trend}`.
//! Entries reading `tbd` or empty are placeholders and are returned as-is.

use std::collections::HashMap;

use crate::error::AppError;

/// The message table. Combinations not listed have no message.
pub const SCORE_MESSAGES: &[(&str, &str)] = &[
    ("1010", "頭がぼーっとして思うようにうまく進まない状態。大事な判断はせず、なんとか1日をしのいで、"),
    ("1020", "大事な判断で間違えたり、うっかり忘れおきるかもです。大事なことは決めないようにしましょう"),
    ("1030", "気が散りやすく、思ったより集中が保ちづらい日。まとまった作業をやる場合は集中できる環境つくってから"),
    ("1040", "たっぷり寝たけど疲れのとれ具合はまだ半分、無理は禁物。早めに大事なことはとりかかって！"),
    ("1011", ""),
    ("1021", "我慢がしづらい一日。苦手な仕事、気の進まないことを根気よくやるのが難しい一日。出来ることを探してしっかり消化しよう。"),
    ("1031", "体力は十分に回復している。気持ちが続かない部分もあり、最後の詰めはあまくなりがち、意思決定の量は減らそう"),
    ("1041", "睡眠は十分だけど万全ではなさそう。熱い飲み物、熱いシャワー、ちょっと運動などで、シャキッとしてみて"),
    ("2010", "なかなか厳しい一日。ストレッチや軽めの運動で適宜リフレッシュしつつ乗り切って！ちょっとした思いつきでやることは失敗しやすいので控えてね"),
    ("2020", "集中が続かずあまり気の進まない事や大変な事があるとめげそうになるかも。そこで投げ出さずもう一度トライしてみて。大事な事は早めの時間で片付けよう"),
    ("2030", "体調、気持思っているよりよいです。それに比例して進むか難しいと思っていたことも、思った以上の成果がでます。いつもよりアクティブに活動してみましょ。"),
    ("2040", "たっぷり寝たけど疲れのとれ具合はまだ半分、無理は禁物。早めに大事なことはとりかかって！"),
    ("2011", "tbd"),
    ("2021", "tbd"),
    ("2031", "睡眠よくとれてますね。体はリフレッシュですが集中力は全開ではないので、大事な仕事は早めに着手！"),
    ("2041", "睡眠十分で頭スッキリ！フレッシュな気持で仕事ができそう。集中力は全開ではないので、大事な仕事は早めに着手！"),
    ("3010", "体力が限界。比較的早い時間に集中をして仕事を片付けてしまおう。夜は早めの就寝！"),
    ("3020", "集中はまあまあできるが１６時くらいがタイムリミット。大事なことは早めに終わらせて！"),
    ("3030", "頭はすっきり！十分なパフォーマンスは出せる日。根気強くやり抜こう"),
    ("3040", "体も気力十分です。新しいこと難しいことどんどんチャレンジしよう！"),
    ("3011", "tbd"),
    ("3021", "まだデータないです。今日のところを記録にいれてね"),
    ("3031", "まだデータないです。今日のところを記録にいれてね"),
    ("3041", "まだデータないです。今日のところを記録にいれてね"),
    ("3110", "寝不足と疲労でだいぶ体はしんどそう。集中力は少しありそうなので、やるべき事やって今日は早く休んで！"),
    ("3120", "なんとかパフォーマンスは出せそう。時間を区切って大事な仕事から片付けて。夜は早めに休息を！"),
    ("3130", "体力気力ともまずまず！やったことないことに思い切ってチャレンジしてみて。疲れまだのこっているので夜は早めに休息を！"),
    ("3140", "睡眠十分で頭はスッキリ！でも疲れは残ってるので体調くずしやすいかも。無理は禁物"),
    ("3111", ""),
    ("3121", "まだデータないです。今日のところを記録にいれてね"),
    ("3131", "まだデータないです。今日のところを記録にいれてね"),
    ("3141", "ここ何日かよく寝てよく活動して素晴らしいですね。リフレッシュしてるので何か新しい事に手をつけてみよう。疲れまだ残っているみたいなので今日も軽い運動いれるとよいよ"),
    ("4010", "疲労感あるかも。でも気持ちは充実してるので、少し体を動かすとパフォーマンスは多少でるはず。頑張って！"),
    ("4020", "思ったよりはちゃんと結果を出せた。気を抜かずに積み上げていくと最後にいいことあるよ、頑張って"),
    ("4030", "頭はすっきりしていて、ストレスに強く色々考えられる状態。難しいとおもっていることに積極チャレンジしよう"),
    ("4040", "気力体力十分色々チャレンジしてみて！昨日の疲れが残る場合は軽めの運動で疲労回復するといいかも"),
    ("4011", "tbd"),
    ("4021", "まだデータないです。今日のところを記録にいれてね"),
    ("4031", "頭はすっきり。気分良くすごせる１日。ストレスに強く色々考えられる状態。難しいとおもっていることに積極チャレンジしよう"),
    ("4041", "気力体力十分色々！これは完璧な1日になりそう。なんでもできますよ。大事なことを思いっきりすすめて！"),
    ("4110", "かなり疲れているご様子。今日は亀の様にじっとして明日に備えよう。体調崩しやすいから要注意！"),
    ("4120", "ちょっとした判断ミスを悔やむかもしれませんが大丈夫それほど重大ではないです。選んだことが正解になるように動きましょう。疲れはあるので、早めに休息して！"),
    ("4130", "よく寝てよく動いて充実してますね。色々なことチャレンジできるよ。ただ疲れは溜まってそう。休養も心がけて！"),
    ("4140", "一晩の睡眠で頭はすっきり。やれていなかっことできるかも。でもまだ疲れは溜まっているので、油断しないで"),
    ("4111", "tbd"),
    ("4121", "まだデータないです。今日のところを記録にいれてね"),
    ("4131", "まだデータないです。今日のところを記録にいれてね"),
    ("4141", "ここ何日かいつもと違うペースですね。旅行とかですか？いつもやっていることも新鮮な気持ちでみてみよう。疲れまだ残っているみたいなので回復もしてね"),
];

/// Lookup table built once at startup from [`SCORE_MESSAGES`].
#[derive(Debug, Clone)]
pub struct ScoreMessages {
    messages: HashMap<&'static str, &'static str>,
}

impl Default for ScoreMessages {
    fn default() -> Self {
        Self::load()
    }
}

impl ScoreMessages {
    pub fn load() -> Self {
        Self {
            messages: SCORE_MESSAGES.iter().copied().collect(),
        }
    }

    /// Message for a composite key. An unmapped key is an error, never a
    /// blank message.
    pub fn lookup(&self, key: &str) -> Result<&'static str, AppError> {
        self.messages
            .get(key)
            .copied()
            .ok_or_else(|| AppError::MissingScoreMapping(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
